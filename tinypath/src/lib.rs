use std::borrow::Cow;

pub use tinypath_ast::{CompareOp, InvalidProgram, Program, Selector};
pub use tinypath_data_model::{Value, ValueKind};
pub use tinypath_evaluator::{EvalError, EvalErrorKind, Expected};
pub use tinypath_parser::{CompileError, CompileErrorKind};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Compiles a path such as `$.store.books[0].price<10` into a reusable
/// [`Program`].
pub fn compile(source: &str) -> Result<Program, CompileError> {
    tinypath_parser::parse(source)
}

pub fn evaluate<'v>(program: &Program, value: &'v Value) -> Result<Cow<'v, Value>, EvalError> {
    tinypath_evaluator::evaluate(program, value)
}

/// Compiles `path` and runs it once against `value`.
pub fn query(path: &str, value: &Value) -> Result<Value, Error> {
    let program = compile(path)?;
    Ok(evaluate(&program, value)?.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    fn string(s: &str) -> Value {
        Value::String(s.to_owned())
    }

    #[test]
    fn test_simple_select() {
        let path = compile("$.foo").unwrap();
        let data = body(json!({"foo": "bar"}));
        let result = evaluate(&path, &data).unwrap();
        assert_eq!(*result, string("bar"));
    }

    #[test]
    fn test_index_array() {
        let data = body(json!({"foo": ["bar", "baz"]}));
        let path = compile("$.foo[0]").unwrap();
        assert_eq!(*evaluate(&path, &data).unwrap(), string("bar"));

        let out_of_range = compile("$.foo[10]").unwrap();
        let err = evaluate(&out_of_range, &data).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::IndexOutOfRange { index: 10, len: 2 });
    }

    #[test]
    fn test_index_empty_array() {
        let path = compile("$.foo[0]").unwrap();
        let err = evaluate(&path, &body(json!({"foo": []}))).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::EmptyArray);
    }

    #[test]
    fn test_wildcard_select() {
        let path = compile("$.foo.*").unwrap();
        let data = body(json!({"foo": {"one": "bar", "two": "baz"}}));
        let result = evaluate(&path, &data).unwrap();
        assert_eq!(*result, Value::Array(vec![string("bar"), string("baz")]));
    }

    #[test]
    fn test_multiple_traverses() {
        let path = compile("$.foo.bar").unwrap();
        let data = body(json!({"foo": {"bar": "baz"}}));
        let first = evaluate(&path, &data).unwrap().into_owned();
        let second = evaluate(&path, &data).unwrap().into_owned();
        assert_eq!(first, string("baz"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_comparisons() {
        let two = body(json!({"foo": 2}));
        let greater = compile("$.foo>1").unwrap();
        assert_eq!(*evaluate(&greater, &two).unwrap(), Value::Bool(true));
        let less = compile("$.foo<1").unwrap();
        assert_eq!(*evaluate(&less, &two).unwrap(), Value::Bool(false));

        let err = evaluate(&less, &body(json!({"foo": "bar"}))).unwrap_err();
        assert_eq!(
            err.kind,
            EvalErrorKind::TypeMismatch {
                expected: Expected::Number,
                found: ValueKind::String
            }
        );
    }

    #[test]
    fn test_compile_errors_do_not_panic() {
        assert_eq!(
            compile("$foo").unwrap_err().kind,
            CompileErrorKind::MissingDotAfterRoot
        );
        assert_eq!(
            compile("$..").unwrap_err().kind,
            CompileErrorKind::UnsupportedRecursiveDescent
        );
    }

    #[test]
    fn test_recompiling_is_idempotent() {
        for source in ["$", "$.a.b", "$.a.*[1]", "$.a[]>=3"] {
            assert_eq!(compile(source).unwrap(), compile(source).unwrap());
        }
    }

    #[test]
    fn test_query_error_families() {
        let data = body(json!({"a": [1, 2]}));
        assert_eq!(query("$.a[1]", &data), Ok(Value::Number(2.)));
        assert!(matches!(query("$.a]", &data), Err(Error::Compile(_))));
        assert!(matches!(query("$.b", &data), Err(Error::Eval(_))));
    }

    #[test]
    fn test_program_shared_across_threads() {
        let program = compile("$.items.price>10").unwrap();
        let inputs: Vec<Value> = (0..8)
            .map(|i| body(json!({"items": {"price": i * 3}})))
            .collect();

        let program = &program;
        let results: Vec<Value> = std::thread::scope(|scope| {
            let handles: Vec<_> = inputs
                .iter()
                .map(|input| scope.spawn(move || evaluate(program, input).unwrap().into_owned()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let expected: Vec<Value> = (0..8).map(|i| Value::Bool(i * 3 > 10)).collect();
        assert_eq!(results, expected);
    }
}
