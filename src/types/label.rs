//! Quality label vocabulary

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Two-valued wine quality verdict.
///
/// The derive order (`Good` before `NotGood`) doubles as the fixed
/// deterministic ordering used to break exact consensus ties.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum QualityLabel {
    #[serde(rename = "good")]
    Good,
    #[serde(rename = "not good")]
    NotGood,
}

impl QualityLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::NotGood => "not good",
        }
    }
}

impl fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityLabel {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "good" => Ok(Self::Good),
            "not good" | "not_good" | "bad" => Ok(Self::NotGood),
            other => Err(UnknownLabel(other.to_string())),
        }
    }
}

/// A label string outside the public vocabulary.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown quality label: {0:?}")]
pub struct UnknownLabel(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_serialization() {
        assert_eq!(
            serde_json::to_string(&QualityLabel::Good).unwrap(),
            "\"good\""
        );
        assert_eq!(
            serde_json::to_string(&QualityLabel::NotGood).unwrap(),
            "\"not good\""
        );
    }

    #[test]
    fn test_label_parsing() {
        assert_eq!("good".parse::<QualityLabel>().unwrap(), QualityLabel::Good);
        assert_eq!(
            "Not Good".parse::<QualityLabel>().unwrap(),
            QualityLabel::NotGood
        );
        assert!("excellent".parse::<QualityLabel>().is_err());
    }

    #[test]
    fn test_tie_break_ordering() {
        // Good sorts first; consensus tie-breaking relies on this.
        assert!(QualityLabel::Good < QualityLabel::NotGood);
    }
}
