use super::Operator;
use crate::error::{ErrorKind, Result};
use crate::models::Constraint;
use exn::ResultExt;
use regex::Regex;
use serde_json::Value;

/// The parsed right-hand side of a constraint.
#[derive(Debug, Clone)]
enum Operand {
    Literal(Value),
    Number(f64),
    List(Vec<Value>),
    Text(String),
    Pattern(Regex),
}

/// A constraint compiled for repeated evaluation.
///
/// Parsing (operator lookup, number conversion, regex compilation) happens
/// once when the flag is prepared, so a malformed constraint fails the
/// refresh instead of every evaluation.
#[derive(Debug, Clone)]
pub struct Condition {
    property: String,
    operator: Operator,
    operand: Operand,
}
impl Condition {
    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Returns `true` if the property in `context` satisfies this condition.
    ///
    /// A property missing from the context never matches, whichever way the
    /// operator points.
    pub fn matches(&self, context: &Value) -> bool {
        let Some(actual) = context.get(&self.property) else {
            return false;
        };
        let hit = match &self.operand {
            Operand::Literal(expected) => loosely_equal(actual, expected),
            Operand::Number(expected) => match actual.as_f64() {
                Some(actual) => match self.operator {
                    Operator::Lt => actual < *expected,
                    Operator::Lte => actual <= *expected,
                    Operator::Gt => actual > *expected,
                    Operator::Gte => actual >= *expected,
                    _ => false,
                },
                None => return false,
            },
            Operand::List(candidates) => candidates.iter().any(|c| loosely_equal(actual, c)),
            Operand::Text(needle) => match actual.as_str() {
                Some(haystack) => haystack.contains(needle.as_str()),
                None => return false,
            },
            Operand::Pattern(pattern) => match actual.as_str() {
                Some(haystack) => pattern.is_match(haystack),
                None => return false,
            },
        };
        hit != self.operator.is_negated()
    }
}
impl TryFrom<&Constraint> for Condition {
    type Error = crate::error::Error;
    fn try_from(constraint: &Constraint) -> Result<Self> {
        if constraint.property.trim().is_empty() {
            exn::bail!(ErrorKind::EmptyProperty(constraint.id));
        }
        let operator: Operator = constraint.operator.parse()?;
        let invalid = || ErrorKind::ConstraintValue {
            property: constraint.property.clone(),
            operator: operator.to_string(),
            value: constraint.value.clone(),
        };
        let literal = parse_literal(&constraint.value);
        let operand = match operator {
            Operator::Eq | Operator::Neq => Operand::Literal(literal),
            Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte => match literal.as_f64() {
                Some(number) => Operand::Number(number),
                None => exn::bail!(invalid()),
            },
            Operator::In | Operator::NotIn => match literal {
                Value::Array(items) => Operand::List(items),
                _ => exn::bail!(invalid()),
            },
            Operator::Contains | Operator::NotContains => match literal {
                Value::String(needle) => Operand::Text(needle),
                _ => exn::bail!(invalid()),
            },
            Operator::Ereg | Operator::Nereg => match literal {
                Value::String(pattern) => Operand::Pattern(Regex::new(&pattern).or_raise(invalid)?),
                _ => exn::bail!(invalid()),
            },
        };
        Ok(Self { property: constraint.property.clone(), operator, operand })
    }
}

/// Constraint values are JSON literals (`"CA"`, `42`, `["a","b"]`), but bare
/// words like `CA` are common enough to accept as strings.
fn parse_literal(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// `1` and `1.0` are the same number as far as targeting is concerned.
fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn constraint(property: &str, operator: &str, value: &str) -> Constraint {
        Constraint {
            id: 1,
            segment_id: 1,
            property: property.to_string(),
            operator: operator.to_string(),
            value: value.to_string(),
            ..Default::default()
        }
    }

    #[rstest]
    #[case("state", "EQ", r#""CA""#, json!({"state": "CA"}), true)]
    #[case("state", "EQ", "CA", json!({"state": "CA"}), true)]
    #[case("state", "NEQ", r#""CA""#, json!({"state": "NY"}), true)]
    #[case("age", "GT", "18", json!({"age": 21}), true)]
    #[case("age", "LTE", "18", json!({"age": 18.0}), true)]
    #[case("age", "LT", "18", json!({"age": "17"}), false)]
    #[case("state", "IN", r#"["CA","NY"]"#, json!({"state": "NY"}), true)]
    #[case("tier", "NOTIN", "[1, 2]", json!({"tier": 3}), true)]
    #[case("email", "EREG", r#"".+@example\\.com$""#, json!({"email": "a@example.com"}), true)]
    #[case("email", "NEREG", r#"".+@example\\.com$""#, json!({"email": "a@example.com"}), false)]
    #[case("agent", "CONTAINS", r#""Firefox""#, json!({"agent": "Mozilla Firefox 120"}), true)]
    #[case("agent", "NOTCONTAINS", r#""Firefox""#, json!({"agent": "Chrome"}), true)]
    #[case("state", "NEQ", r#""CA""#, json!({}), false)]
    fn test_condition_matches(
        #[case] property: &str,
        #[case] operator: &str,
        #[case] value: &str,
        #[case] context: Value,
        #[case] expected: bool,
    ) {
        let condition = Condition::try_from(&constraint(property, operator, value)).unwrap();
        assert_eq!(condition.matches(&context), expected);
    }

    #[rstest]
    #[case("age", "GT", r#""old""#)]
    #[case("state", "IN", r#""CA""#)]
    #[case("email", "EREG", r#""(unclosed""#)]
    #[case("agent", "CONTAINS", "12")]
    fn test_invalid_operand(#[case] property: &str, #[case] operator: &str, #[case] value: &str) {
        let err = Condition::try_from(&constraint(property, operator, value)).unwrap_err();
        assert!(matches!(*err, ErrorKind::ConstraintValue { .. }), "unexpected error: {err:?}");
    }

    #[test]
    fn test_empty_property() {
        let err = Condition::try_from(&constraint("  ", "EQ", "1")).unwrap_err();
        assert_eq!(*err, ErrorKind::EmptyProperty(1));
    }

    #[test]
    fn test_unknown_operator() {
        let err = Condition::try_from(&constraint("state", "LIKE", "CA")).unwrap_err();
        assert_eq!(*err, ErrorKind::Operator("LIKE".to_string()));
    }
}
