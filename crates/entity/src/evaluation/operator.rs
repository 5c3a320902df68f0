use crate::error::{Error, ErrorKind};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Comparison operators understood by constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    /// Regular expression match.
    Ereg,
    /// Regular expression non-match.
    Nereg,
    In,
    NotIn,
    Contains,
    NotContains,
}
impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "EQ",
            Self::Neq => "NEQ",
            Self::Lt => "LT",
            Self::Lte => "LTE",
            Self::Gt => "GT",
            Self::Gte => "GTE",
            Self::Ereg => "EREG",
            Self::Nereg => "NEREG",
            Self::In => "IN",
            Self::NotIn => "NOTIN",
            Self::Contains => "CONTAINS",
            Self::NotContains => "NOTCONTAINS",
        }
    }

    /// Whether a match is reported as a non-match (and vice versa).
    pub(crate) fn is_negated(&self) -> bool {
        matches!(self, Self::Neq | Self::Nereg | Self::NotIn | Self::NotContains)
    }
}
impl FromStr for Operator {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "EQ" => Self::Eq,
            "NEQ" => Self::Neq,
            "LT" => Self::Lt,
            "LTE" => Self::Lte,
            "GT" => Self::Gt,
            "GTE" => Self::Gte,
            "EREG" => Self::Ereg,
            "NEREG" => Self::Nereg,
            "IN" => Self::In,
            "NOTIN" => Self::NotIn,
            "CONTAINS" => Self::Contains,
            "NOTCONTAINS" => Self::NotContains,
            _ => exn::bail!(ErrorKind::Operator(s.to_string())),
        })
    }
}
impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("EQ", Operator::Eq)]
    #[case("neq", Operator::Neq)]
    #[case(" GTE ", Operator::Gte)]
    #[case("NotIn", Operator::NotIn)]
    #[case("EREG", Operator::Ereg)]
    #[case("NOTCONTAINS", Operator::NotContains)]
    fn test_parse_operator(#[case] input: &str, #[case] expected: Operator) {
        assert_eq!(input.parse::<Operator>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown_operator() {
        let err = "LIKE".parse::<Operator>().unwrap_err();
        assert_eq!(*err, ErrorKind::Operator("LIKE".to_string()));
    }

    #[test]
    fn test_display_round_trips() {
        for op in [Operator::Lt, Operator::In, Operator::Nereg] {
            assert_eq!(op.to_string().parse::<Operator>().unwrap(), op);
        }
    }
}
