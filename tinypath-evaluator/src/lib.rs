use std::borrow::Cow;
use std::fmt;

use tinypath_ast::{Program, Selector};
use tinypath_data_model::{Value, ValueKind};
use tracing::trace;

/// The shape a selector needed but did not find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    Object,
    Array,
    ObjectOrArray,
    Number,
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Expected::Object => "Object",
            Expected::Array => "Array",
            Expected::ObjectOrArray => "Object or Array",
            Expected::Number => "Number",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalErrorKind {
    #[error("no such key '{0}'")]
    NoSuchKey(String),
    #[error("expected {expected}, got {found}")]
    TypeMismatch { expected: Expected, found: ValueKind },
    #[error("cannot index an empty array")]
    EmptyArray,
    #[error("index {index} out of range for array of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("comparison literal is not a number")]
    NonNumericComparisonOperand,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("at path {path}, {kind}")]
pub struct EvalError {
    pub kind: EvalErrorKind,
    /// path text up to and including the step that failed
    pub path: String,
}

impl EvalError {
    fn new(kind: EvalErrorKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    fn mismatch(expected: Expected, found: &Value, path: impl Into<String>) -> Self {
        Self::new(
            EvalErrorKind::TypeMismatch {
                expected,
                found: found.kind(),
            },
            path,
        )
    }
}

/// Where the current step sits in the path, for error messages.
struct Step<'p> {
    /// path including this step
    path: &'p str,
    /// path before this step
    parent: &'p str,
}

fn apply<'v>(value: &'v Value, selector: &Selector, step: &Step) -> Result<Cow<'v, Value>, EvalError> {
    match selector {
        Selector::Key(name) => match value {
            Value::Object(_) => value
                .get(name)
                .map(Cow::Borrowed)
                .ok_or_else(|| EvalError::new(EvalErrorKind::NoSuchKey(name.clone()), step.path)),
            Value::Array(items) => {
                let projected = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        let at = || format!("{}[{i}].{name}", step.parent);
                        match item {
                            Value::Object(_) => item.get(name).cloned().ok_or_else(|| {
                                EvalError::new(EvalErrorKind::NoSuchKey(name.clone()), at())
                            }),
                            other => Err(EvalError::mismatch(Expected::Object, other, at())),
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Cow::Owned(Value::Array(projected)))
            }
            other => Err(EvalError::mismatch(Expected::Object, other, step.path)),
        },
        Selector::Wildcard => match value {
            Value::Object(members) => Ok(Cow::Owned(Value::Array(
                members.iter().map(|(_, v)| v.clone()).collect(),
            ))),
            Value::Array(_) => Ok(Cow::Borrowed(value)),
            other => Err(EvalError::mismatch(Expected::ObjectOrArray, other, step.path)),
        },
        &Selector::Index(index) => match value {
            Value::Array(items) if items.is_empty() => {
                Err(EvalError::new(EvalErrorKind::EmptyArray, step.path))
            }
            Value::Array(items) => items.get(index).map(Cow::Borrowed).ok_or_else(|| {
                EvalError::new(
                    EvalErrorKind::IndexOutOfRange {
                        index,
                        len: items.len(),
                    },
                    step.path,
                )
            }),
            other => Err(EvalError::mismatch(Expected::Array, other, step.path)),
        },
        &Selector::Compare { op, literal } => {
            if literal.is_nan() {
                return Err(EvalError::new(
                    EvalErrorKind::NonNumericComparisonOperand,
                    step.path,
                ));
            }
            match value {
                &Value::Number(n) => Ok(Cow::Owned(Value::Bool(op.apply(n, literal)))),
                other => Err(EvalError::mismatch(Expected::Number, other, step.path)),
            }
        }
    }
}

/// Runs `program` against `value`, one selector at a time.
///
/// Sub-values are borrowed from `value` where possible. The first failing
/// selector ends evaluation; no partial result is returned.
pub fn evaluate<'v>(program: &Program, value: &'v Value) -> Result<Cow<'v, Value>, EvalError> {
    let mut path = String::from("$");
    let mut current = Cow::Borrowed(value);

    for (index, selector) in program.iter().enumerate() {
        trace!(index, %selector, found = %current.kind(), "applying selector");
        let parent_len = path.len();
        path.push_str(&selector.to_string());
        let step = Step {
            path: &path,
            parent: &path[..parent_len],
        };
        current = match current {
            Cow::Borrowed(value) => apply(value, selector, &step)?,
            Cow::Owned(value) => Cow::Owned(apply(&value, selector, &step)?.into_owned()),
        };
    }

    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tinypath_ast::CompareOp;

    fn value(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    fn program(selectors: Vec<Selector>) -> Program {
        Program::new(selectors).unwrap()
    }

    fn key(name: &str) -> Selector {
        Selector::Key(name.to_owned())
    }

    #[test]
    fn test_empty_program_is_identity() {
        let data = value(json!({"a": 1}));
        let result = evaluate(&Program::empty(), &data).unwrap();
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(*result, data);
    }

    #[test]
    fn test_key_borrows_from_input() {
        let data = value(json!({"a": {"b": [1, 2]}}));
        let result = evaluate(&program(vec![key("a"), key("b")]), &data).unwrap();
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(*result, value(json!([1, 2])));
    }

    #[test]
    fn test_missing_key() {
        let data = value(json!({"a": {"b": 1}}));
        let err = evaluate(&program(vec![key("a"), key("c")]), &data).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::NoSuchKey("c".to_owned()));
        assert_eq!(err.path, "$.a.c");
        assert_eq!(err.to_string(), "at path $.a.c, no such key 'c'");
    }

    #[test]
    fn test_key_over_array_projects_each_element() {
        let data = value(json!({"items": [{"id": 1}, {"id": 2}, {"id": 3}]}));
        let result = evaluate(&program(vec![key("items"), key("id")]), &data).unwrap();
        assert_eq!(*result, value(json!([1, 2, 3])));
    }

    #[test]
    fn test_key_over_array_rejects_non_objects() {
        let data = value(json!({"items": [{"id": 1}, "oops"]}));
        let err = evaluate(&program(vec![key("items"), key("id")]), &data).unwrap_err();
        assert_eq!(
            err.kind,
            EvalErrorKind::TypeMismatch {
                expected: Expected::Object,
                found: ValueKind::String
            }
        );
        assert_eq!(err.path, "$.items[1].id");
    }

    #[test]
    fn test_key_over_array_missing_in_element() {
        let data = value(json!([{"id": 1}, {"name": "x"}]));
        let err = evaluate(&program(vec![key("id")]), &data).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::NoSuchKey("id".to_owned()));
        assert_eq!(err.path, "$[1].id");
    }

    #[test]
    fn test_key_on_scalar() {
        let data = value(json!({"a": 3}));
        let err = evaluate(&program(vec![key("a"), key("b")]), &data).unwrap_err();
        assert_eq!(
            err.to_string(),
            "at path $.a.b, expected Object, got Number"
        );
    }

    #[test]
    fn test_wildcard_over_object_keeps_order() {
        let data = value(json!({"z": 1, "a": 2, "m": 3}));
        let result = evaluate(&program(vec![Selector::Wildcard]), &data).unwrap();
        assert_eq!(*result, value(json!([1, 2, 3])));
    }

    #[test]
    fn test_wildcard_over_array_is_identity() {
        let data = value(json!([1, "two", null]));
        let result = evaluate(&program(vec![Selector::Wildcard]), &data).unwrap();
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(*result, data);
    }

    #[test]
    fn test_wildcard_on_scalar() {
        let err = evaluate(&program(vec![Selector::Wildcard]), &Value::Bool(true)).unwrap_err();
        assert_eq!(
            err.kind,
            EvalErrorKind::TypeMismatch {
                expected: Expected::ObjectOrArray,
                found: ValueKind::Bool
            }
        );
        assert_eq!(err.path, "$.*");
    }

    #[test]
    fn test_index() {
        let data = value(json!(["a", "b", "c"]));
        let result = evaluate(&program(vec![Selector::Index(2)]), &data).unwrap();
        assert_eq!(*result, Value::String("c".to_owned()));

        let err = evaluate(&program(vec![Selector::Index(3)]), &data).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::IndexOutOfRange { index: 3, len: 3 });
        assert_eq!(err.path, "$[3]");
    }

    #[test]
    fn test_index_empty_array() {
        let data = value(json!({"a": []}));
        let err = evaluate(&program(vec![key("a"), Selector::Index(0)]), &data).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::EmptyArray);
    }

    #[test]
    fn test_index_on_object() {
        let data = value(json!({"a": {"0": 1}}));
        let err = evaluate(&program(vec![key("a"), Selector::Index(0)]), &data).unwrap_err();
        assert_eq!(err.to_string(), "at path $.a[0], expected Array, got Object");
    }

    #[test]
    fn test_index_into_materialized_array() {
        let data = value(json!({"a": {"x": "first", "y": "second"}}));
        let result =
            evaluate(&program(vec![key("a"), Selector::Wildcard, Selector::Index(1)]), &data)
                .unwrap();
        assert_eq!(*result, Value::String("second".to_owned()));
    }

    #[test]
    fn test_compare() {
        let data = value(json!({"n": 2}));
        let compare = |op, literal| {
            evaluate(&program(vec![key("n"), Selector::Compare { op, literal }]), &data)
                .unwrap()
                .into_owned()
        };
        assert_eq!(compare(CompareOp::Gt, 1.), Value::Bool(true));
        assert_eq!(compare(CompareOp::Lt, 1.), Value::Bool(false));
        assert_eq!(compare(CompareOp::Le, 2.), Value::Bool(true));
        assert_eq!(compare(CompareOp::Ge, 2.5), Value::Bool(false));
        assert_eq!(compare(CompareOp::Eq, 2.), Value::Bool(true));
        assert_eq!(compare(CompareOp::Ne, 2.), Value::Bool(false));
    }

    #[test]
    fn test_compare_non_number() {
        let data = value(json!({"n": "2"}));
        let lt = Selector::Compare {
            op: CompareOp::Lt,
            literal: 1.,
        };
        let err = evaluate(&program(vec![key("n"), lt]), &data).unwrap_err();
        assert_eq!(
            err.kind,
            EvalErrorKind::TypeMismatch {
                expected: Expected::Number,
                found: ValueKind::String
            }
        );
        assert_eq!(err.path, "$.n<1");
    }

    #[test]
    fn test_compare_nan_literal() {
        let nan = Selector::Compare {
            op: CompareOp::Eq,
            literal: f64::NAN,
        };
        let err = evaluate(&program(vec![nan]), &Value::Number(1.)).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::NonNumericComparisonOperand);
    }
}
