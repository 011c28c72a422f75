//! Interpretation of write outcomes into a single verdict.
//!
//! The engine reports a write as an object with an optional `valid` flag and an
//! optional `limitViolations` list. Either may be missing or oddly shaped, so
//! the interpreter works through fallbacks in a fixed order and records which
//! one produced the validity decision.

use serde_json::Value;
use tracing::{debug, warn};

use crate::core::messages::{Locale, ViolationField};
use crate::core::normalize::{DEFAULT_MAX_DEPTH, Normalizer, WRAPPER_FIELDS};
use crate::core::value::{CyclePolicy, FactObject, FactValue, to_json};

pub const VALID_FIELD: &str = "valid";
pub const VIOLATIONS_FIELD: &str = "limitViolations";

/// Accepted spellings for each violation field, preferred name first.
const FIELD_ALIASES: [(ViolationField, &[&str]); 5] = [
    (ViolationField::Rule, &["ruleName", "limitName"]),
    (ViolationField::Path, &["factPath"]),
    (ViolationField::Limit, &["limitValue", "limit"]),
    (ViolationField::Actual, &["actualValue", "actual"]),
    (ViolationField::Level, &["severityLevel", "level"]),
];

/// A business rule reported as failed by a write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LimitViolation {
    pub rule_name: Option<String>,
    pub fact_path: Option<String>,
    pub limit_value: Option<String>,
    pub actual_value: Option<String>,
    pub severity_level: Option<String>,
}

impl LimitViolation {
    /// Read a violation from an engine value. Non-objects yield an empty
    /// violation; null or empty fields count as absent.
    pub fn from_value(value: &FactValue, normalizer: &Normalizer) -> Self {
        let mut violation = LimitViolation::default();
        let FactValue::Object(object) = value else {
            return violation;
        };
        for (field, names) in FIELD_ALIASES {
            let text = names
                .iter()
                .find_map(|name| object.field(name).filter(|value| !value.is_null()))
                .map(|value| normalizer.normalize(&value))
                .filter(|text| !text.is_empty());
            *violation.slot(field) = text;
        }
        violation
    }

    pub fn get(&self, field: ViolationField) -> Option<&str> {
        match field {
            ViolationField::Rule => self.rule_name.as_deref(),
            ViolationField::Path => self.fact_path.as_deref(),
            ViolationField::Limit => self.limit_value.as_deref(),
            ViolationField::Actual => self.actual_value.as_deref(),
            ViolationField::Level => self.severity_level.as_deref(),
        }
    }

    fn slot(&mut self, field: ViolationField) -> &mut Option<String> {
        match field {
            ViolationField::Rule => &mut self.rule_name,
            ViolationField::Path => &mut self.fact_path,
            ViolationField::Limit => &mut self.limit_value,
            ViolationField::Actual => &mut self.actual_value,
            ViolationField::Level => &mut self.severity_level,
        }
    }

    /// Present fields as `label: value`, in fixed order, joined by ` / `.
    pub fn format(&self, locale: Locale) -> String {
        ViolationField::ORDER
            .iter()
            .filter_map(|field| self.get(*field).map(|value| locale.pair(*field, value)))
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

/// Where the validity decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValiditySource {
    /// The write produced no structured outcome.
    NoOutcome,
    /// `valid` was a boolean on the outcome itself.
    Direct,
    /// `valid` was recovered from a defensive copy of the outcome.
    Snapshot,
    /// No signal was obtainable; the write is assumed valid.
    Assumed,
}

/// Pass/fail summary of a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub valid: bool,
    pub validity: ValiditySource,
    pub violations: Vec<LimitViolation>,
    /// Text to surface; `None` means success with nothing to report.
    pub message: Option<String>,
}

impl Verdict {
    fn success(validity: ValiditySource) -> Self {
        Self {
            valid: true,
            validity,
            violations: Vec::new(),
            message: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.message.is_none()
    }

    /// A failed write; anything else is at most advisory.
    pub fn is_blocking(&self) -> bool {
        !self.valid
    }
}

#[derive(Debug, Clone)]
pub struct OutcomeInterpreter {
    locale: Locale,
    normalizer: Normalizer,
    max_depth: usize,
}

impl Default for OutcomeInterpreter {
    fn default() -> Self {
        Self::new(Locale::default(), Normalizer::default(), DEFAULT_MAX_DEPTH)
    }
}

impl OutcomeInterpreter {
    pub fn new(locale: Locale, normalizer: Normalizer, max_depth: usize) -> Self {
        Self {
            locale,
            normalizer,
            max_depth,
        }
    }

    pub fn interpret(&self, outcome: Option<&FactValue>) -> Verdict {
        let Some(FactValue::Object(object)) = outcome else {
            debug!("write returned no structured outcome");
            return Verdict::success(ValiditySource::NoOutcome);
        };

        let violations: Vec<LimitViolation> = self
            .violation_items(object)
            .iter()
            .map(|item| LimitViolation::from_value(item, &self.normalizer))
            .collect();
        let (valid, validity) = self.validity(object);

        let formatted = self.format_all(&violations);
        let message = if !valid {
            Some(formatted.unwrap_or_else(|| self.locale.no_detailed_violation().to_string()))
        } else {
            formatted
        };

        Verdict {
            valid,
            validity,
            violations,
            message,
        }
    }

    /// Non-empty formatted violations joined by newlines.
    fn format_all(&self, violations: &[LimitViolation]) -> Option<String> {
        let lines: Vec<String> = violations
            .iter()
            .map(|violation| violation.format(self.locale))
            .filter(|line| !line.is_empty())
            .collect();
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }

    fn violation_items(&self, object: &FactObject) -> Vec<FactValue> {
        match object.field(VIOLATIONS_FIELD) {
            None | Some(FactValue::Null) => Vec::new(),
            Some(FactValue::List(list)) => list.try_items().unwrap_or_else(|err| {
                warn!(error = %err, "could not read limit violations");
                Vec::new()
            }),
            Some(other) => match to_json(&other, CyclePolicy::Fail, self.max_depth) {
                Ok(Value::Array(items)) => items.iter().map(FactValue::from_json).collect(),
                Ok(_) => {
                    debug!("limit violations are not a sequence, ignoring");
                    Vec::new()
                }
                Err(err) => {
                    warn!(error = %err, "could not copy limit violations");
                    Vec::new()
                }
            },
        }
    }

    fn validity(&self, object: &std::rc::Rc<FactObject>) -> (bool, ValiditySource) {
        if let Some(valid) = object.field(VALID_FIELD).and_then(|value| value.as_bool()) {
            return (valid, ValiditySource::Direct);
        }

        let outcome = FactValue::Object(object.clone());
        match to_json(&outcome, CyclePolicy::Fail, self.max_depth) {
            Ok(snapshot) => match recover_valid(&snapshot[VALID_FIELD]) {
                Some(valid) => (valid, ValiditySource::Snapshot),
                None => {
                    warn!("write outcome carries no validity flag, assuming valid");
                    (true, ValiditySource::Assumed)
                }
            },
            Err(err) => {
                warn!(error = %err, "could not copy write outcome, assuming valid");
                (true, ValiditySource::Assumed)
            }
        }
    }
}

/// A boolean, possibly boxed in `item`/`value` wrappers.
fn recover_valid(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(valid) => Some(*valid),
        Value::Object(map) => WRAPPER_FIELDS
            .iter()
            .find_map(|name| map.get(*name))
            .and_then(recover_valid),
        _ => None,
    }
}

/// Interpret with default settings.
pub fn interpret(outcome: Option<&FactValue>) -> Verdict {
    OutcomeInterpreter::default().interpret(outcome)
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use serde_json::json;

    use super::*;

    fn outcome(json: Value) -> FactValue {
        FactValue::from_json(&json)
    }

    #[test]
    fn missing_outcome_is_success() {
        let verdict = interpret(None);
        assert!(verdict.is_success());
        assert_eq!(verdict.validity, ValiditySource::NoOutcome);
    }

    #[test]
    fn non_object_outcome_is_success() {
        for value in [FactValue::Null, FactValue::from(true), FactValue::list(vec![])] {
            let verdict = interpret(Some(&value));
            assert!(verdict.is_success());
            assert!(!verdict.is_blocking());
        }
    }

    #[test]
    fn invalid_without_violations_uses_fixed_message() {
        let verdict = interpret(Some(&outcome(json!({
            "valid": false,
            "limitViolations": []
        }))));
        assert!(verdict.is_blocking());
        assert_eq!(
            verdict.message.as_deref(),
            Some(Locale::En.no_detailed_violation())
        );
    }

    #[test]
    fn invalid_with_empty_violation_uses_fixed_message() {
        let verdict = interpret(Some(&outcome(json!({
            "valid": false,
            "limitViolations": [{}]
        }))));
        assert_eq!(
            verdict.message.as_deref(),
            Some(Locale::En.no_detailed_violation())
        );
    }

    #[test]
    fn valid_with_violations_is_advisory() {
        let verdict = interpret(Some(&outcome(json!({
            "valid": true,
            "limitViolations": [{
                "ruleName": "max",
                "factPath": "/a",
                "limit": "10",
                "actual": "20"
            }]
        }))));
        assert!(!verdict.is_blocking());
        assert_eq!(
            verdict.message.as_deref(),
            Some("rule: max / path: /a / limit: 10 / actual: 20")
        );
    }

    #[test]
    fn invalid_violations_are_joined_by_newline() {
        let verdict = interpret(Some(&outcome(json!({
            "valid": false,
            "limitViolations": [
                { "limitName": "max", "level": "error" },
                { "factPath": "/b", "actualValue": 3 }
            ]
        }))));
        assert_eq!(
            verdict.message.as_deref(),
            Some("rule: max / level: error\npath: /b / actual: 3")
        );
    }

    #[test]
    fn field_order_is_fixed_regardless_of_input_order() {
        let violation = LimitViolation::from_value(
            &outcome(json!({
                "severityLevel": "warn",
                "actualValue": "5",
                "factPath": "/x",
                "ruleName": "min"
            })),
            &Normalizer::default(),
        );
        assert_eq!(
            violation.format(Locale::En),
            "rule: min / path: /x / actual: 5 / level: warn"
        );
    }

    #[test]
    fn null_and_empty_fields_are_omitted() {
        let violation = LimitViolation::from_value(
            &outcome(json!({ "ruleName": null, "factPath": "", "limit": 0 })),
            &Normalizer::default(),
        );
        assert_eq!(violation.format(Locale::En), "limit: 0");
    }

    #[test]
    fn wrapped_field_values_are_normalized() {
        let violation = LimitViolation::from_value(
            &outcome(json!({ "limit": { "$type": "Dollar", "item": "10.00" } })),
            &Normalizer::default(),
        );
        assert_eq!(violation.limit_value.as_deref(), Some("10.00"));
    }

    #[test]
    fn localized_labels_are_used() {
        let interpreter =
            OutcomeInterpreter::new(Locale::ZhTw, Normalizer::default(), DEFAULT_MAX_DEPTH);
        let verdict = interpreter.interpret(Some(&outcome(json!({
            "valid": false,
            "limitViolations": [{ "limitName": "max", "actual": "20" }]
        }))));
        assert_eq!(verdict.message.as_deref(), Some("限制：max / 實際值：20"));
    }

    #[test]
    fn boxed_validity_is_recovered_from_snapshot() {
        let verdict = interpret(Some(&outcome(json!({
            "valid": { "$type": "BooleanWrapper", "item": false },
            "limitViolations": []
        }))));
        assert!(!verdict.valid);
        assert_eq!(verdict.validity, ValiditySource::Snapshot);
    }

    #[test]
    fn missing_validity_is_assumed_valid() {
        let verdict = interpret(Some(&outcome(json!({ "limitViolations": [] }))));
        assert!(verdict.valid);
        assert!(verdict.is_success());
        assert_eq!(verdict.validity, ValiditySource::Assumed);
    }

    #[test]
    fn uncopyable_outcome_is_assumed_valid() {
        let object = Rc::new(FactObject::new());
        object.insert("self", FactValue::Object(object.clone()));

        let verdict = interpret(Some(&FactValue::Object(object)));
        assert!(verdict.valid);
        assert_eq!(verdict.validity, ValiditySource::Assumed);
    }

    #[test]
    fn direct_flag_wins_even_when_outcome_is_cyclic() {
        let object = Rc::new(FactObject::new().with_field("valid", false));
        object.insert("self", FactValue::Object(object.clone()));

        let verdict = interpret(Some(&FactValue::Object(object)));
        assert!(verdict.is_blocking());
        assert_eq!(verdict.validity, ValiditySource::Direct);
    }

    #[test]
    fn non_list_violations_are_coerced_through_copy() {
        let violations = FactObject::new().with_field("ruleName", "max");
        let wrapped_list: FactValue = FactObject::new().with_field("0", violations).into();
        let object = FactObject::new()
            .with_field("valid", true)
            .with_field(VIOLATIONS_FIELD, wrapped_list);

        let verdict = interpret(Some(&object.into()));
        assert!(verdict.violations.is_empty());
        assert!(verdict.is_success());
    }

    #[test]
    fn opaque_violations_are_ignored() {
        let object = FactObject::new()
            .with_field("valid", true)
            .with_field(VIOLATIONS_FIELD, FactValue::opaque("Seq"));

        let verdict = interpret(Some(&object.into()));
        assert!(verdict.violations.is_empty());
        assert!(verdict.is_success());
    }
}
