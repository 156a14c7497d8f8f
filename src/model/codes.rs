use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Department short codes used everywhere in the API.
/// BD = business, FD = finance, LD = lending.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
pub enum Department {
    BD,
    FD,
    LD,
}

/// Position tiers: M = manager, S = supervisor, C = clerk.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
pub enum Position {
    M,
    S,
    C,
}

impl Department {
    pub fn as_str(&self) -> &'static str {
        match self {
            Department::BD => "BD",
            Department::FD => "FD",
            Department::LD => "LD",
        }
    }
}

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::M => "M",
            Position::S => "S",
            Position::C => "C",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn department_codes_round_trip() {
        for code in ["BD", "FD", "LD"] {
            let dept = Department::from_str(code).unwrap();
            assert_eq!(dept.as_str(), code);
            assert_eq!(dept.to_string(), code);
        }
        assert!(Department::from_str("HR").is_err());
    }

    #[test]
    fn position_codes_round_trip() {
        for code in ["M", "S", "C"] {
            let pos = Position::from_str(code).unwrap();
            assert_eq!(pos.as_str(), code);
        }
        assert!(Position::from_str("X").is_err());
    }
}
