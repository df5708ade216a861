//! KEY=VALUE argument parsing.
//!
//! Values are parsed as JSON first so numbers, booleans, lists, and quoted
//! strings arrive typed; anything that is not valid JSON is passed through as
//! a plain string, which keeps `query=ada` ergonomic.

use std::collections::BTreeMap;

use valet_protocol::Value;

use super::errors::AppError;

/// Parses one `KEY=VALUE` pair.
pub(crate) fn parse_argument(raw: &str) -> Result<(String, Value), AppError> {
    let (key, value) = raw.split_once('=').ok_or_else(|| AppError::InvalidArgument {
        argument: raw.to_owned(),
    })?;
    if key.is_empty() {
        return Err(AppError::InvalidArgument {
            argument: raw.to_owned(),
        });
    }
    let parsed = serde_json::from_str::<serde_json::Value>(value)
        .map_or_else(|_| Value::str(value), Value::from);
    Ok((key.to_owned(), parsed))
}

/// Parses every pair into the request argument map. Later duplicates win.
pub(crate) fn parse_arguments<I, S>(raw: I) -> Result<BTreeMap<String, Value>, AppError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut arguments = BTreeMap::new();
    for pair in raw {
        let (key, value) = parse_argument(pair.as_ref())?;
        arguments.insert(key, value);
    }
    Ok(arguments)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("limit=5", Value::Int(5))]
    #[case("completed=true", Value::Bool(true))]
    #[case("note=null", Value::Null)]
    #[case("query=ada", Value::str("ada"))]
    #[case("name=\"Ada Lovelace\"", Value::str("Ada Lovelace"))]
    #[case("due=2026-09-01", Value::str("2026-09-01"))]
    fn values_parse_as_json_with_string_fallback(#[case] raw: &str, #[case] expected: Value) {
        let (_, value) = parse_argument(raw).expect("parse");
        assert_eq!(value, expected);
    }

    #[test]
    fn lists_arrive_typed() {
        let (key, value) = parse_argument("phones=[\"555 010\"]").expect("parse");
        assert_eq!(key, "phones");
        assert_eq!(value, Value::list([Value::str("555 010")]));
    }

    #[test]
    fn pairs_without_equals_are_rejected() {
        assert!(matches!(
            parse_argument("query"),
            Err(AppError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn empty_keys_are_rejected() {
        assert!(matches!(
            parse_argument("=value"),
            Err(AppError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn later_duplicates_win() {
        let arguments = parse_arguments(["limit=1", "limit=2"]).expect("parse");
        assert_eq!(arguments.get("limit"), Some(&Value::Int(2)));
    }
}
