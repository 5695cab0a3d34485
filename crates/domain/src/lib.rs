//! # homerule-domain
//!
//! Pure domain model for the homerule event–condition–action engine.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Values** (`Number | Bool | Text`) and the single coercion rule
//!   every condition uses
//! - Define the **rule grammar**: tokenizer, parser, clauses, join operators
//! - Define **Events** (sensor kinds, reading shapes, the anomaly state machine)
//! - Define **Actions** (actuator kinds, per-kind command micro-grammars,
//!   the relevance diff behind idempotent dispatch)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod action;
pub mod event;
pub mod rule;
pub mod value;
