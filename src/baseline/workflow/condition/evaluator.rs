//! Condition evaluator
//!
//! Applies an operator to an expected and an observed value. A `false`
//! evaluation is a rule failure; an `Err` means the operator could not be
//! applied at all and is reported as an evaluation error.
//!
//! When the probe observed nothing, Equals/Contains/RegexMatch evaluate to
//! `false`, NotEquals/NotContains to `true`, and GreaterThan/LessThan are an
//! error.

use super::operator::Operator;
use crate::baseline::workflow::types::Condition;
use crate::sdk::error::{EvaluatorError, ValidationError};
use crate::sdk::value::{as_number, as_text, describe, kind, loosely_equal};
use regex::Regex;
use serde_json::Value;

/// Outcome of applying a condition
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub passed: bool,
    pub explanation: String,
}

impl Evaluation {
    fn new(passed: bool, explanation: impl Into<String>) -> Self {
        Self {
            passed,
            explanation: explanation.into(),
        }
    }
}

/// A validated condition with its pattern compiled
#[derive(Debug, Clone)]
pub struct CompiledCondition {
    operator: Operator,
    expected: Option<Value>,
    pattern: Option<Regex>,
}

impl CompiledCondition {
    /// Validate `condition`; `field` is its document path, e.g. `Rules[0].Condition`
    pub fn compile(condition: &Condition, field: &str) -> Result<Self, Vec<ValidationError>> {
        let mut errors = Vec::new();
        let operator = &condition.operator;
        let expected_field = format!("{}.Expected", field);

        if operator.is_missing() {
            errors.push(ValidationError::missing(format!("{}.Operator", field)));
            return Err(errors);
        }
        if !operator.is_recognized() {
            errors.push(ValidationError::UnknownOperator {
                field: format!("{}.Operator", field),
                value: operator.to_string(),
            });
            return Err(errors);
        }

        let mut pattern = None;
        match (&condition.expected, operator.requires_expected()) {
            (None, true) => errors.push(ValidationError::MissingExpected {
                field: expected_field,
                operator: operator.to_string(),
            }),
            (Some(expected), true) if operator.is_ordering() => {
                if as_number(expected).is_none() {
                    errors.push(ValidationError::InvalidExpected {
                        field: expected_field,
                        reason: format!(
                            "{} requires a numeric value, got {} {}",
                            operator,
                            kind(expected),
                            describe(expected)
                        ),
                    });
                }
            }
            (Some(expected), true) if *operator == Operator::RegexMatch => {
                match expected.as_str().map(full_match_regex) {
                    Some(Ok(re)) => pattern = Some(re),
                    Some(Err(e)) => errors.push(ValidationError::InvalidExpected {
                        field: expected_field,
                        reason: e.to_string(),
                    }),
                    None => errors.push(ValidationError::InvalidExpected {
                        field: expected_field,
                        reason: format!(
                            "RegexMatch requires a string pattern, got {}",
                            kind(expected)
                        ),
                    }),
                }
            }
            _ => {}
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self {
            operator: operator.clone(),
            expected: condition.expected.clone(),
            pattern,
        })
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    pub fn expected(&self) -> Option<&Value> {
        self.expected.as_ref()
    }

    /// Apply the condition to an observation
    pub fn evaluate(&self, observed: Option<&Value>) -> Result<Evaluation, EvaluatorError> {
        evaluate_with(
            &self.operator,
            self.expected.as_ref(),
            observed,
            self.pattern.as_ref(),
        )
    }
}

/// Apply `operator` to `expected` and `observed`
pub fn evaluate(
    operator: &Operator,
    expected: Option<&Value>,
    observed: Option<&Value>,
) -> Result<Evaluation, EvaluatorError> {
    evaluate_with(operator, expected, observed, None)
}

fn evaluate_with(
    operator: &Operator,
    expected: Option<&Value>,
    observed: Option<&Value>,
    pattern: Option<&Regex>,
) -> Result<Evaluation, EvaluatorError> {
    match operator {
        Operator::Exists => Ok(match observed {
            Some(v) => Evaluation::new(true, format!("value exists: {}", describe(v))),
            None => Evaluation::new(false, "no value found"),
        }),
        Operator::NotExists => Ok(match observed {
            Some(v) => Evaluation::new(false, format!("value exists: {}", describe(v))),
            None => Evaluation::new(true, "no value found"),
        }),
        Operator::Equals => {
            let expected = require_expected(operator, expected)?;
            Ok(check_equals(expected, observed, false))
        }
        Operator::NotEquals => {
            let expected = require_expected(operator, expected)?;
            Ok(check_equals(expected, observed, true))
        }
        Operator::GreaterThan | Operator::LessThan => {
            let expected = require_expected(operator, expected)?;
            compare_numbers(operator, expected, observed)
        }
        Operator::Contains => {
            let expected = require_expected(operator, expected)?;
            check_contains(operator, expected, observed, false)
        }
        Operator::NotContains => {
            let expected = require_expected(operator, expected)?;
            check_contains(operator, expected, observed, true)
        }
        Operator::RegexMatch => {
            let expected = require_expected(operator, expected)?;
            check_regex(expected, observed, pattern)
        }
        Operator::Unrecognized(name) => Err(EvaluatorError::UnsupportedOperator(name.clone())),
    }
}

fn require_expected<'a>(
    operator: &Operator,
    expected: Option<&'a Value>,
) -> Result<&'a Value, EvaluatorError> {
    expected.ok_or_else(|| EvaluatorError::MissingExpected {
        operator: operator.to_string(),
    })
}

fn check_equals(expected: &Value, observed: Option<&Value>, negate: bool) -> Evaluation {
    let Some(observed) = observed else {
        return Evaluation::new(
            negate,
            format!("no value found, expected {}", describe(expected)),
        );
    };

    let equal = loosely_equal(observed, expected);
    let explanation = if equal {
        format!(
            "observed {} equals {}",
            describe(observed),
            describe(expected)
        )
    } else {
        format!(
            "observed {} does not equal {}",
            describe(observed),
            describe(expected)
        )
    };
    Evaluation::new(equal != negate, explanation)
}

fn compare_numbers(
    operator: &Operator,
    expected: &Value,
    observed: Option<&Value>,
) -> Result<Evaluation, EvaluatorError> {
    let observed = observed.ok_or_else(|| EvaluatorError::MissingObservation {
        operator: operator.to_string(),
    })?;
    let lhs = as_number(observed).ok_or_else(|| EvaluatorError::TypeMismatch {
        operator: operator.to_string(),
        required: "a numeric observed value",
        actual: format!("{} {}", kind(observed), describe(observed)),
    })?;
    let rhs = as_number(expected).ok_or_else(|| EvaluatorError::TypeMismatch {
        operator: operator.to_string(),
        required: "a numeric expected value",
        actual: format!("{} {}", kind(expected), describe(expected)),
    })?;

    let (passed, relation) = match operator {
        Operator::GreaterThan => (lhs > rhs, "greater than"),
        _ => (lhs < rhs, "less than"),
    };
    let explanation = if passed {
        format!("observed {} is {} {}", lhs, relation, rhs)
    } else {
        format!("observed {} is not {} {}", lhs, relation, rhs)
    };
    Ok(Evaluation::new(passed, explanation))
}

fn check_contains(
    operator: &Operator,
    expected: &Value,
    observed: Option<&Value>,
    negate: bool,
) -> Result<Evaluation, EvaluatorError> {
    let found = match observed {
        None => {
            return Ok(Evaluation::new(
                negate,
                format!("no value found to search for {}", describe(expected)),
            ))
        }
        Some(Value::String(text)) => {
            let needle = as_text(expected).ok_or_else(|| EvaluatorError::TypeMismatch {
                operator: operator.to_string(),
                required: "a scalar expected value for text search",
                actual: format!("{} {}", kind(expected), describe(expected)),
            })?;
            text.contains(needle.as_str())
        }
        Some(Value::Array(items)) => items.iter().any(|item| loosely_equal(item, expected)),
        Some(other) => {
            return Err(EvaluatorError::TypeMismatch {
                operator: operator.to_string(),
                required: "observed text or a sequence",
                actual: format!("{} {}", kind(other), describe(other)),
            })
        }
    };

    let observed_text = observed.map(describe).unwrap_or_default();
    let explanation = if found {
        format!("{} contains {}", observed_text, describe(expected))
    } else {
        format!("{} does not contain {}", observed_text, describe(expected))
    };
    Ok(Evaluation::new(found != negate, explanation))
}

fn check_regex(
    expected: &Value,
    observed: Option<&Value>,
    pattern: Option<&Regex>,
) -> Result<Evaluation, EvaluatorError> {
    let source = expected
        .as_str()
        .ok_or_else(|| EvaluatorError::TypeMismatch {
            operator: Operator::RegexMatch.to_string(),
            required: "a string pattern",
            actual: format!("{} {}", kind(expected), describe(expected)),
        })?;

    let compiled;
    let regex = match pattern {
        Some(re) => re,
        None => {
            compiled = full_match_regex(source)?;
            &compiled
        }
    };

    let Some(observed) = observed else {
        return Ok(Evaluation::new(
            false,
            format!("no value found to match /{}/", source),
        ));
    };
    let text = as_text(observed).ok_or_else(|| EvaluatorError::TypeMismatch {
        operator: Operator::RegexMatch.to_string(),
        required: "an observed scalar",
        actual: format!("{} {}", kind(observed), describe(observed)),
    })?;

    let matched = regex.is_match(&text);
    let explanation = if matched {
        format!("observed {} matches /{}/", describe(observed), source)
    } else {
        format!(
            "observed {} does not match /{}/",
            describe(observed),
            source
        )
    };
    Ok(Evaluation::new(matched, explanation))
}

/// Anchor a pattern so it must match the whole input
fn full_match_regex(source: &str) -> Result<Regex, EvaluatorError> {
    Regex::new(&format!("^(?:{})$", source)).map_err(|e| EvaluatorError::InvalidPattern {
        pattern: source.to_string(),
        message: e.to_string(),
    })
}
