//! Page categories.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ActionError;

/// Coarse classification of the page a selection was made on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageCategory {
    #[default]
    General,
    News,
    Academic,
    Documentation,
    Development,
    Social,
    Shopping,
    Reference,
}

impl PageCategory {
    pub const ALL: [PageCategory; 8] = [
        Self::General,
        Self::News,
        Self::Academic,
        Self::Documentation,
        Self::Development,
        Self::Social,
        Self::Shopping,
        Self::Reference,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::News => "news",
            Self::Academic => "academic",
            Self::Documentation => "documentation",
            Self::Development => "development",
            Self::Social => "social",
            Self::Shopping => "shopping",
            Self::Reference => "reference",
        }
    }
}

impl fmt::Display for PageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageCategory {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| ActionError::UnknownCategory(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_category() {
        assert_eq!("News".parse::<PageCategory>().unwrap(), PageCategory::News);
        assert_eq!(" development ".parse::<PageCategory>().unwrap(), PageCategory::Development);
        assert!(matches!(
            "blog".parse::<PageCategory>(),
            Err(ActionError::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_category_serde() {
        let json = serde_json::to_string(&PageCategory::Shopping).unwrap();
        assert_eq!(json, r#""shopping""#);
    }
}
