//! Regex compilation for identifier patterns and exclusions

use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::error::ProfileError;
use crate::model::IdExtractionConfig;

/// A compiled identifier pattern
#[derive(Debug, Clone)]
pub struct NamedPattern {
    /// Pattern name from the profile
    pub name: String,
    /// Compiled expression
    pub regex: Regex,
    /// Confidence configured for this pattern
    pub confidence: f64,
}

impl NamedPattern {
    /// First match in `text`, as capture group 1 (or the whole match when
    /// the pattern has no group), trimmed.
    pub fn find_id(&self, text: &str) -> Option<String> {
        let captures = self.regex.captures(text)?;
        let matched = captures.get(1).or_else(|| captures.get(0))?;
        Some(matched.as_str().trim().to_string())
    }
}

/// Compile every pattern of a profile, keeping declaration order.
///
/// Unknown flag names are ignored.
pub fn compile_patterns(config: &IdExtractionConfig) -> Result<Vec<NamedPattern>, ProfileError> {
    config
        .patterns
        .iter()
        .map(|(name, pattern)| {
            let mut builder = RegexBuilder::new(&pattern.regex);
            for flag in pattern.flags.split('|').map(str::trim) {
                match flag {
                    "IGNORECASE" => {
                        builder.case_insensitive(true);
                    }
                    "MULTILINE" => {
                        builder.multi_line(true);
                    }
                    "DOTALL" => {
                        builder.dot_matches_new_line(true);
                    }
                    "" => {}
                    other => debug!("Ignoring unknown regex flag {} on pattern {}", other, name),
                }
            }
            let regex = builder.build().map_err(|e| ProfileError::Regex {
                name: name.clone(),
                message: e.to_string(),
            })?;
            Ok(NamedPattern {
                name: name.clone(),
                regex,
                confidence: pattern.confidence,
            })
        })
        .collect()
}

/// Compile exclusions as case-insensitive whole-string matchers.
pub fn compile_exclusions(exclusions: &[String]) -> Result<Vec<Regex>, ProfileError> {
    exclusions
        .iter()
        .map(|pattern| {
            RegexBuilder::new(&format!(r"\A(?:{})\z", pattern))
                .case_insensitive(true)
                .build()
                .map_err(|e| ProfileError::Regex {
                    name: pattern.clone(),
                    message: e.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IdPatternConfig;

    fn config_with(name: &str, pattern: IdPatternConfig) -> IdExtractionConfig {
        let mut config = IdExtractionConfig::default();
        config.patterns.insert(name.to_string(), pattern);
        config
    }

    #[test]
    fn test_flags_are_applied() {
        let config = config_with(
            "sec",
            IdPatternConfig {
                regex: r"section\s+(\d+)".to_string(),
                flags: "IGNORECASE | DOTALL".to_string(),
                confidence: 0.9,
            },
        );
        let compiled = compile_patterns(&config).unwrap();
        assert_eq!(compiled[0].find_id("See SECTION 12 here").as_deref(), Some("12"));
        assert!((compiled[0].confidence - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unknown_flags_ignored() {
        let config = config_with(
            "sec",
            IdPatternConfig {
                regex: r"Section (\d+)".to_string(),
                flags: "VERBOSE".to_string(),
                confidence: 0.8,
            },
        );
        let compiled = compile_patterns(&config).unwrap();
        assert!(compiled[0].find_id("section 3").is_none());
        assert_eq!(compiled[0].find_id("Section 3").as_deref(), Some("3"));
    }

    #[test]
    fn test_pattern_without_group_uses_whole_match() {
        let config = config_with("plain", IdPatternConfig::exact(r"[A-Z]\d+"));
        let compiled = compile_patterns(&config).unwrap();
        assert_eq!(compiled[0].find_id("rule B12 applies").as_deref(), Some("B12"));
    }

    #[test]
    fn test_invalid_regex_reports_pattern_name() {
        let config = config_with("broken", IdPatternConfig::exact(r"(unclosed"));
        match compile_patterns(&config) {
            Err(ProfileError::Regex { name, .. }) => assert_eq!(name, "broken"),
            other => panic!("expected regex error, got {:?}", other),
        }
    }

    #[test]
    fn test_exclusions_match_whole_string_only() {
        let exclusions = compile_exclusions(&IdExtractionConfig::default().exclusions).unwrap();
        let excluded = |s: &str| exclusions.iter().any(|r| r.is_match(s));

        assert!(excluded("2020"));
        assert!(excluded("15%"));
        assert!(excluded("5 MG"));
        assert!(excluded("10ppm"));
        assert!(!excluded("101.61"));
        assert!(!excluded("2020.1"));
    }
}
