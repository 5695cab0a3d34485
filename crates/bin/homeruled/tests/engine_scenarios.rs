//! End-to-end scenarios for the full homerule stack.
//!
//! Each test wires the real engine (rule manager, dispatch queue and
//! worker, conflict arbiter) to the virtual adapter, driving time through
//! a manual clock so cooldown windows are deterministic.

use std::sync::Arc;
use std::time::Duration;

use homerule_adapter_virtual::{GatewayCall, LoggingNotifier, ManualClock, StaticDescriptions, VirtualGateway};
use homerule_app::arbiter::SuppressionReason;
use homerule_app::context::{EngineConfig, EngineContext};
use homerule_app::dispatch::{DispatchError, DispatchOutcome, DispatchQueue, DispatchReport};
use homerule_app::ports::{AnomalyNotifier, Clock};
use homerule_app::services::{RuleManager, RuleRecord};
use homerule_domain::action::{ActionKind, ActionSpec, ClimateMode, ClimateState};
use homerule_domain::event::{AnomalyReading, EventKind, EventSpec, Transition};
use homerule_domain::value::Value;
use tokio::sync::broadcast;

struct Stack {
    manager: RuleManager<VirtualGateway, StaticDescriptions>,
    gateway: Arc<VirtualGateway>,
    notifier: Arc<LoggingNotifier>,
    clock: Arc<ManualClock>,
    reports: broadcast::Receiver<DispatchReport>,
}

/// Build a fully-wired engine with a small home inventory.
fn stack() -> Stack {
    let gateway = Arc::new(VirtualGateway::new());
    let notifier = Arc::new(LoggingNotifier::new());
    let clock = Arc::new(ManualClock::default());
    let (queue, worker) = DispatchQueue::new(64);
    let reports = queue.subscribe();
    let _worker = worker.spawn();

    let context = EngineContext::new(
        Arc::clone(&gateway),
        queue,
        Arc::clone(&clock) as Arc<dyn Clock>,
        Arc::clone(&notifier) as Arc<dyn AnomalyNotifier>,
        EngineConfig::default(),
    );
    let descriptions = StaticDescriptions::new().with("server room too hot", "server room overheating");
    let mut manager = RuleManager::new(context, descriptions);

    for (name, kind, location) in [
        ("living room temperature", EventKind::Temperature, "living room"),
        ("living room motion", EventKind::Motion, "living room"),
        ("server room overheating", EventKind::Anomaly, "server room"),
    ] {
        manager.register_event(EventSpec::new(name, kind, location).expect("valid event"));
    }
    for (kind, location, target) in [
        (ActionKind::Climate, "living room", None),
        (ActionKind::Light, "living room", None),
        (ActionKind::Notification, "home", Some("+15550100".to_string())),
    ] {
        manager.register_action(ActionSpec::new(kind, location, target).expect("valid action"));
    }

    Stack {
        manager,
        gateway,
        notifier,
        clock,
        reports,
    }
}

async fn next_report(reports: &mut broadcast::Receiver<DispatchReport>) -> DispatchReport {
    tokio::time::timeout(Duration::from_secs(1), reports.recv())
        .await
        .expect("a dispatch report within a second")
        .expect("report channel open")
}

async fn assert_quiet(reports: &mut broadcast::Receiver<DispatchReport>) {
    let pending = tokio::time::timeout(Duration::from_millis(50), reports.recv()).await;
    assert!(pending.is_err(), "unexpected report: {pending:?}");
}

fn set(stack: &Stack, event: &str, value: impl Into<Value>) {
    stack
        .manager
        .update_event_value(event, value.into())
        .expect("reading accepted");
}

// ---------------------------------------------------------------------------
// Threshold rules
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_cool_living_room_once_when_temperature_crosses_threshold() {
    let mut s = stack();
    s.manager
        .create_rule("if living room temperature > 25 then living room ac on 21 cool")
        .await
        .unwrap();

    set(&s, "living room temperature", 20.0);
    assert_quiet(&mut s.reports).await;
    assert_eq!(s.gateway.climate_state("living room"), None);

    set(&s, "living room temperature", 30.0);
    let report = next_report(&mut s.reports).await;
    assert!(report.outcome.is_dispatched());
    assert_eq!(
        s.gateway.climate_state("living room"),
        Some(ClimateState {
            on: true,
            temperature: Some(21.0),
            mode: Some(ClimateMode::Cool),
        })
    );

    set(&s, "living room temperature", 31.0);
    assert_eq!(next_report(&mut s.reports).await.outcome, DispatchOutcome::NoOp);
    assert_eq!(s.gateway.calls().len(), 1);
}

#[tokio::test]
async fn should_combine_clauses_with_and() {
    let mut s = stack();
    s.manager
        .create_rule("if living room temperature > 25 and living room motion detected then living room light on")
        .await
        .unwrap();

    set(&s, "living room temperature", 30.0);
    assert_quiet(&mut s.reports).await;

    set(&s, "living room motion", true);
    assert!(next_report(&mut s.reports).await.outcome.is_dispatched());
    assert_eq!(s.gateway.light_state("living room"), Some(true));
}

// ---------------------------------------------------------------------------
// Conflict arbitration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_suppress_opposite_climate_intent_until_window_elapses() {
    let mut s = stack();
    s.manager
        .create_rule("if living room temperature > 25 then living room ac on 21 cool")
        .await
        .unwrap();
    s.manager
        .create_rule("if living room motion not detected then living room ac off")
        .await
        .unwrap();

    set(&s, "living room temperature", 30.0);
    assert!(next_report(&mut s.reports).await.outcome.is_dispatched());

    s.clock.advance(Duration::from_secs(3));
    set(&s, "living room motion", false);
    assert_eq!(
        next_report(&mut s.reports).await.outcome,
        DispatchOutcome::Suppressed(SuppressionReason::ConflictingIntent)
    );
    assert_eq!(s.gateway.climate_state("living room").map(|c| c.on), Some(true));

    s.clock.advance(Duration::from_secs(8));
    set(&s, "living room motion", false);
    assert!(next_report(&mut s.reports).await.outcome.is_dispatched());
    assert_eq!(s.gateway.climate_state("living room").map(|c| c.on), Some(false));
}

// ---------------------------------------------------------------------------
// Gateway failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_retry_after_gateway_failure() {
    let mut s = stack();
    let id = s
        .manager
        .create_rule("if living room motion detected then living room light on")
        .await
        .unwrap();

    s.gateway.set_offline("living room", true);
    set(&s, "living room motion", true);
    let report = next_report(&mut s.reports).await;
    assert!(matches!(report.outcome, DispatchOutcome::Failed(DispatchError::Gateway(_))));
    assert_eq!(report.rule_id, id);
    assert!(s.manager.list_rules()[0].active);

    s.gateway.set_offline("living room", false);
    set(&s, "living room motion", true);
    assert!(next_report(&mut s.reports).await.outcome.is_dispatched());
    assert_eq!(s.gateway.light_state("living room"), Some(true));
}

// ---------------------------------------------------------------------------
// Anomalies
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_alert_and_notify_once_per_rising_edge() {
    let mut s = stack();
    s.manager
        .create_rule("if server room too hot detected then home sms +15550100")
        .await
        .unwrap();

    let update = |detected| {
        s.manager
            .update_anomaly_state("server room overheating", detected, AnomalyReading::default())
            .unwrap()
    };
    assert_eq!(update(false), Transition::Unchanged);
    assert!(s.notifier.alerts().is_empty());

    assert_eq!(update(true), Transition::Rising);
    assert_eq!(update(true), Transition::Unchanged);

    assert!(next_report(&mut s.reports).await.outcome.is_dispatched());
    assert_eq!(next_report(&mut s.reports).await.outcome, DispatchOutcome::NoOp);

    let alerts = s.notifier.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].event, "server room overheating");
    assert_eq!(alerts[0].descriptions, vec!["server room too hot".to_string()]);

    let outbox = s.gateway.outbox();
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].0, "+15550100");
    assert!(outbox[0].1.starts_with("Rule condition met:"));
}

#[tokio::test]
async fn should_deliver_explicit_message_as_written() {
    let mut s = stack();
    s.manager
        .create_rule("if server room overheating detected then home sms +15550100 Fire! Set mode=eco, keep temp<20.")
        .await
        .unwrap();

    s.manager
        .update_anomaly_state("server room overheating", true, AnomalyReading::default())
        .unwrap();
    assert!(next_report(&mut s.reports).await.outcome.is_dispatched());

    assert_eq!(
        s.gateway.outbox(),
        vec![(
            "+15550100".to_string(),
            "Fire! Set mode=eco, keep temp<20".to_string()
        )]
    );
}

#[tokio::test]
async fn should_resend_notification_after_resend_window() {
    let mut s = stack();
    s.manager
        .create_rule("if server room overheating detected then home notify server room too hot")
        .await
        .unwrap();

    let signal = |detected| {
        s.manager
            .update_anomaly_state("server room overheating", detected, AnomalyReading::default())
            .unwrap();
    };
    signal(true);
    assert!(next_report(&mut s.reports).await.outcome.is_dispatched());

    signal(false);
    signal(true);
    assert_eq!(next_report(&mut s.reports).await.outcome, DispatchOutcome::NoOp);

    s.clock.advance(Duration::from_secs(301));
    signal(false);
    signal(true);
    assert!(next_report(&mut s.reports).await.outcome.is_dispatched());

    assert_eq!(s.notifier.alerts().len(), 3);
    assert_eq!(
        s.gateway.calls(),
        vec![
            GatewayCall::Notification {
                address: "+15550100".to_string(),
                message: "server room too hot".to_string(),
            };
            2
        ]
    );
}

// ---------------------------------------------------------------------------
// Rule lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_ignore_readings_after_rule_is_deleted() {
    let mut s = stack();
    let id = s
        .manager
        .create_rule("if living room temperature > 25 then living room ac on 21 cool")
        .await
        .unwrap();

    s.manager.delete_rule(id).unwrap();
    set(&s, "living room temperature", 30.0);

    assert_quiet(&mut s.reports).await;
    assert!(s.gateway.calls().is_empty());
}

#[tokio::test]
async fn should_reload_authoritative_rule_list() {
    let mut s = stack();
    let results = s
        .manager
        .reload_all(vec![
            RuleRecord::active("if living room motion detected then living room light on"),
            RuleRecord {
                text: "if living room temperature > 25 then living room ac on".to_string(),
                active: false,
            },
            RuleRecord::active("if attic temperature > 40 then living room ac on"),
        ])
        .await;

    assert!(results[0].is_ok());
    assert!(results[1].is_ok());
    assert!(results[2].is_err());

    set(&s, "living room temperature", 30.0);
    assert_quiet(&mut s.reports).await;

    set(&s, "living room motion", "on");
    assert!(next_report(&mut s.reports).await.outcome.is_dispatched());

    let snapshot = serde_json::to_value(s.manager.list_rules()).unwrap();
    assert_eq!(snapshot.as_array().map(Vec::len), Some(2));
    assert_eq!(snapshot[1]["active"], false);
}
