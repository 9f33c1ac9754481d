//! Rule evaluation against extracted metadata.
//!
//! Rules run in configured list order and never mutate shared state. A rule
//! whose field is missing from the metadata is skipped without trace; a rule
//! whose field is present is counted in `rules_checked` even when a later
//! type-alignment failure skips it.

use tracing::debug;
use vigil_model::{
    FailedRule, FieldValue, MetadataMap, RuleAction, RuleOperator, RuleValue, ValidationRule,
    ValidationVerdict,
};

/// Fields probed in milliseconds but compared in seconds.
const DURATION_FIELDS: &[&str] = &["general_duration", "video_duration"];

/// Result of aligning a field value with a rule's expected type.
enum Coerced {
    Value(FieldValue),
    Skip,
}

/// Evaluate `rules` in order against `metadata`.
///
/// The verdict is invalid iff at least one failed rule carries
/// `RuleAction::Reject`; failed accept-action rules are recorded in
/// `failed_rules` but do not reject on their own.
pub fn evaluate(metadata: &MetadataMap, rules: &[ValidationRule]) -> ValidationVerdict {
    let mut rules_checked = Vec::new();
    let mut failed_rules = Vec::new();

    for rule in rules {
        let Some(value) = metadata.get(&rule.field) else {
            continue;
        };
        rules_checked.push(rule.field.clone());

        let value = normalize_duration(&rule.field, value.clone());

        let value = match align_types(value, &rule.value) {
            Coerced::Value(value) => value,
            Coerced::Skip => {
                debug!(field = %rule.field, "rule skipped: incompatible value types");
                continue;
            }
        };

        let Some(condition) = apply_operator(rule.operator, &value, &rule.value) else {
            debug!(field = %rule.field, "rule skipped: operator not applicable");
            continue;
        };

        // Reject polarity: a reject rule passes when its condition did NOT
        // occur; an accept rule passes when it did.
        let passed = match rule.action {
            RuleAction::Reject => !condition,
            RuleAction::Accept => condition,
        };

        if !passed {
            failed_rules.push(FailedRule {
                field: rule.field.clone(),
                operator: rule.operator,
                expected_value: rule.value.clone(),
                actual_value: value,
                action: rule.action,
                description: rule.description.clone(),
            });
        }
    }

    let rejected = failed_rules
        .iter()
        .any(|failed| failed.action == RuleAction::Reject);

    ValidationVerdict {
        valid: !rejected,
        rules_checked,
        failed_rules,
    }
}

fn normalize_duration(field: &str, value: FieldValue) -> FieldValue {
    if !DURATION_FIELDS.contains(&field) {
        return value;
    }
    match value {
        FieldValue::Number(millis) => {
            let seconds = millis / 1000.0;
            debug!(field, millis, seconds, "duration normalized to seconds");
            FieldValue::Number(seconds)
        }
        other => other,
    }
}

/// Align the field value with a scalar expected value: numeric threshold
/// against a string field parses the field, string threshold against a
/// numeric field stringifies it. Sequence thresholds compare as-is.
fn align_types(value: FieldValue, expected: &RuleValue) -> Coerced {
    match (value, expected) {
        (FieldValue::Text(text), RuleValue::Number(_)) => match text.trim().parse::<f64>() {
            Ok(parsed) => Coerced::Value(FieldValue::Number(parsed)),
            Err(_) => Coerced::Skip,
        },
        (FieldValue::Number(number), RuleValue::Text(_)) => {
            Coerced::Value(FieldValue::Text(format_number(number)))
        }
        (value, _) => Coerced::Value(value),
    }
}

/// Whole numbers print without a trailing `.0` so they compare equal to the
/// strings humans write in configs.
fn format_number(number: f64) -> String {
    if number.fract() == 0.0 && number.is_finite() {
        format!("{}", number as i64)
    } else {
        number.to_string()
    }
}

fn apply_operator(
    operator: RuleOperator,
    actual: &FieldValue,
    expected: &RuleValue,
) -> Option<bool> {
    use std::cmp::Ordering;

    match operator {
        RuleOperator::Gt | RuleOperator::Lt | RuleOperator::Ge | RuleOperator::Le => {
            let ordering = compare_scalars(actual, expected)?;
            Some(match operator {
                RuleOperator::Gt => ordering == Ordering::Greater,
                RuleOperator::Lt => ordering == Ordering::Less,
                RuleOperator::Ge => ordering != Ordering::Less,
                RuleOperator::Le => ordering != Ordering::Greater,
                _ => unreachable!(),
            })
        }
        RuleOperator::Eq => Some(scalar_equals(actual, expected)),
        RuleOperator::Ne => Some(!scalar_equals(actual, expected)),
        RuleOperator::In => Some(contains(expected, actual)),
        RuleOperator::NotIn => Some(!contains(expected, actual)),
    }
}

fn compare_scalars(actual: &FieldValue, expected: &RuleValue) -> Option<std::cmp::Ordering> {
    match (actual, expected) {
        (FieldValue::Number(a), RuleValue::Number(b)) => a.partial_cmp(b),
        (FieldValue::Text(a), RuleValue::Text(b)) => Some(a.as_str().cmp(b.as_str())),
        _ => None,
    }
}

fn scalar_equals(actual: &FieldValue, expected: &RuleValue) -> bool {
    match (actual, expected) {
        (FieldValue::Number(a), RuleValue::Number(b)) => a == b,
        (FieldValue::Text(a), RuleValue::Text(b)) => a == b,
        _ => false,
    }
}

/// Membership for `in`/`not_in`. A scalar expected value degrades to
/// single-element membership.
fn contains(expected: &RuleValue, actual: &FieldValue) -> bool {
    match expected {
        RuleValue::Many(values) => values.iter().any(|value| value == actual),
        RuleValue::Number(n) => matches!(actual, FieldValue::Number(a) if a == n),
        RuleValue::Text(s) => matches!(actual, FieldValue::Text(a) if a == s),
    }
}
