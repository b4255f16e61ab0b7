//! The operator table: logical operator names as they arrive over
//! the wire, mapped to the SQL tokens (or bespoke shapes) the evaluator
//! renders them as.

use crate::error::{CompileError, CompileResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKind {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    GreaterThanEquals,
    LessThanEquals,
    IsOp,
    InOp,
    Like,
    Between,
    VerifiesRegex,
    StartsWith,
    EndsWith,
    HasSubstring,
    IsChallengeCompleted,
    IsChallengeNotCompleted,
    IsPresent,
}

impl OperatorKind {
    pub fn parse(name: &str, context: &str) -> CompileResult<Self> {
        Ok(match name {
            "equals" => Self::Equals,
            "not_equals" => Self::NotEquals,
            "greater_than" => Self::GreaterThan,
            "less_than" => Self::LessThan,
            "greater_than_equals" => Self::GreaterThanEquals,
            "less_than_equals" => Self::LessThanEquals,
            "is_op" => Self::IsOp,
            "in_op" => Self::InOp,
            "like" => Self::Like,
            "between" => Self::Between,
            "verifies_regex" => Self::VerifiesRegex,
            "starts_with" => Self::StartsWith,
            "ends_with" => Self::EndsWith,
            "has_substring" => Self::HasSubstring,
            "is_challenge_completed" => Self::IsChallengeCompleted,
            "is_challenge_not_completed" => Self::IsChallengeNotCompleted,
            "is_present" => Self::IsPresent,
            other => {
                return Err(CompileError::BadValue {
                    reason: format!("unknown operator `{other}`"),
                    context: context.to_string(),
                })
            }
        })
    }

    /// The plain `col TOKEN value` SQL token. `None` for operators the
    /// evaluator renders with a bespoke shape (wildcarded `LIKE`, the fixed
    /// challenge-completion `EXISTS`, `is_present`'s null/empty pair).
    pub fn token(self) -> Option<&'static str> {
        use OperatorKind::*;
        match self {
            Equals => Some("="),
            NotEquals => Some("<>"),
            GreaterThan => Some(">"),
            LessThan => Some("<"),
            GreaterThanEquals => Some(">="),
            LessThanEquals => Some("<="),
            IsOp => Some("IS"),
            InOp => Some("IN"),
            Like => Some("LIKE"),
            Between => Some("between"),
            VerifiesRegex => Some("REGEXP"),
            StartsWith | EndsWith | HasSubstring | IsChallengeCompleted
            | IsChallengeNotCompleted | IsPresent => None,
        }
    }

    /// `true` for the one binary operator, which additionally requires
    /// `secondary_value`.
    pub fn is_binary(self) -> bool {
        matches!(self, OperatorKind::Between)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_operators() {
        assert_eq!(OperatorKind::parse("equals", "ctx").unwrap(), OperatorKind::Equals);
        assert_eq!(OperatorKind::parse("between", "ctx").unwrap().token(), Some("between"));
    }

    #[test]
    fn rejects_unknown_operator() {
        assert!(OperatorKind::parse("bogus", "ctx").is_err());
    }

    #[test]
    fn only_between_is_binary() {
        assert!(OperatorKind::Between.is_binary());
        assert!(!OperatorKind::Equals.is_binary());
    }
}
