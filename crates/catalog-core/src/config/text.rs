//! Text comparison configuration.

use serde::{Deserialize, Serialize};

/// Controls how stores compare, sort, and search text columns.
///
/// The catalog was built against a Turkish case-insensitive collation, so
/// the defaults reproduce that: ordering uses the ICU `tr-TR` collation and
/// substring search ignores case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextConfig {
    /// Collation applied to text ordering and comparisons. `None` or an
    /// empty string uses the column's default collation.
    #[serde(default = "default_collation")]
    pub collation: Option<String>,
    /// Whether substring search ignores case.
    #[serde(default = "default_case_insensitive")]
    pub case_insensitive: bool,
}

impl TextConfig {
    /// Byte-wise, case-sensitive comparison with no explicit collation.
    pub fn ordinal() -> Self {
        Self {
            collation: None,
            case_insensitive: false,
        }
    }

    /// The collation to apply, if one is configured.
    pub fn collation(&self) -> Option<&str> {
        self.collation.as_deref().filter(|c| !c.trim().is_empty())
    }

    /// Whether the collation follows Turkish casing, where `I` pairs with
    /// dotless `ı` and dotted `İ` pairs with `i`.
    pub fn is_turkish(&self) -> bool {
        self.collation().is_some_and(|c| {
            let c = c.to_ascii_lowercase();
            c == "tr" || c.starts_with("tr-") || c.starts_with("tr_") || c.starts_with("turkish")
        })
    }
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            collation: default_collation(),
            case_insensitive: default_case_insensitive(),
        }
    }
}

fn default_collation() -> Option<String> {
    Some("tr-TR-x-icu".to_string())
}

fn default_case_insensitive() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_collation(name: &str) -> TextConfig {
        TextConfig {
            collation: Some(name.to_string()),
            case_insensitive: true,
        }
    }

    #[test]
    fn test_turkish_collations_are_recognized() {
        assert!(TextConfig::default().is_turkish());
        assert!(with_collation("tr_TR.utf8").is_turkish());
        assert!(with_collation("Turkish_CI_AS").is_turkish());
        assert!(!with_collation("en-US-x-icu").is_turkish());
        assert!(!with_collation("trad").is_turkish());
        assert!(!TextConfig::ordinal().is_turkish());
    }

    #[test]
    fn test_blank_collation_is_none() {
        assert_eq!(with_collation("  ").collation(), None);
    }
}
