//! Rule-driven alerting: predicate definitions and the evaluation engine.

pub mod engine;
pub mod rules;

pub use engine::RuleEngine;
pub use rules::{build_rule, AlertRule, RuleContext};
