//! FQL comparison operators

use std::fmt;
use std::str::FromStr;

use crate::error::FilterError;

/// Comparison operator applied between an FQL field and its value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Equal,
    Not,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl Operator {
    /// Symbol inserted in front of the FQL value
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Equal => "",
            Operator::Not => "!",
            Operator::Greater => ">",
            Operator::GreaterOrEqual => ">=",
            Operator::Less => "<",
            Operator::LessOrEqual => "<=",
        }
    }

    /// Canonical upper-case name, as used in filter key strings (`LastSeen__GTE`)
    pub fn name(&self) -> &'static str {
        match self {
            Operator::Equal => "EQUAL",
            Operator::Not => "NOT",
            Operator::Greater => "GREATER",
            Operator::GreaterOrEqual => "GTE",
            Operator::Less => "LESS",
            Operator::LessOrEqual => "LTE",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operator {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EQUAL" | "EQ" => Ok(Operator::Equal),
            "NOT" | "NE" => Ok(Operator::Not),
            "GREATER" | "GT" => Ok(Operator::Greater),
            "GTE" => Ok(Operator::GreaterOrEqual),
            "LESS" | "LT" => Ok(Operator::Less),
            "LTE" => Ok(Operator::LessOrEqual),
            _ => Err(FilterError::UnknownOperator(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbols() {
        assert_eq!(Operator::Equal.symbol(), "");
        assert_eq!(Operator::Not.symbol(), "!");
        assert_eq!(Operator::GreaterOrEqual.symbol(), ">=");
        assert_eq!(Operator::LessOrEqual.symbol(), "<=");
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("GT".parse::<Operator>().unwrap(), Operator::Greater);
        assert_eq!("greater".parse::<Operator>().unwrap(), Operator::Greater);
        assert_eq!("lte".parse::<Operator>().unwrap(), Operator::LessOrEqual);
        assert!("BETWEEN".parse::<Operator>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for op in [Operator::Equal, Operator::Not, Operator::Less] {
            assert_eq!(op.to_string().parse::<Operator>().unwrap(), op);
        }
    }
}
