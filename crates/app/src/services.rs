//! Application services — use-case implementations.
//!
//! Services accept port implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete
//! adapters.

pub mod rule_manager;

pub use rule_manager::{RuleManager, RuleRecord};
