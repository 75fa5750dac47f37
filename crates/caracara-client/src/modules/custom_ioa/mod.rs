//! Custom IOA rule groups, rules and rule types
//!
//! Local models of custom Indicator of Attack rules. Groups and rules are
//! built from API records or created locally, edited, validated and dumped
//! into create and update request bodies.

mod rule_types;
mod rules;

pub use rule_types::{
    EXCLUDABLE_FIELD, FieldOption, MATCH_ANYTHING, RuleField, RuleType, RuleTypeField, SET_FIELD,
};
pub use rules::{CustomIoaRule, IoaRuleGroup, RuleAction};
