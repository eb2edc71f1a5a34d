use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Единица измерения товара (закрытый набор)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Unit {
    Kg,
    L,
    Piece,
    Box,
    Service,
}

impl Unit {
    pub const ALL: [Unit; 5] = [Unit::Kg, Unit::L, Unit::Piece, Unit::Box, Unit::Service];

    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Kg => "KG",
            Unit::L => "L",
            Unit::Piece => "PIECE",
            Unit::Box => "BOX",
            Unit::Service => "SERVICE",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = String;

    /// Strict parse of the canonical value; vendor input goes through the normalizer instead.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Unit::ALL
            .into_iter()
            .find(|u| u.as_str() == s)
            .ok_or_else(|| format!("Unknown unit: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_values_parse_back() {
        for unit in Unit::ALL {
            assert_eq!(unit.as_str().parse::<Unit>().unwrap(), unit);
        }
        assert!("kg".parse::<Unit>().is_err());
    }

    #[test]
    fn test_serde_uses_canonical_names() {
        assert_eq!(serde_json::to_string(&Unit::Piece).unwrap(), "\"PIECE\"");
        let u: Unit = serde_json::from_str("\"SERVICE\"").unwrap();
        assert_eq!(u, Unit::Service);
    }
}
