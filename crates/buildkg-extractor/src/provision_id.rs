//! Deterministic provision-ID recovery
//!
//! Regex extraction runs before (and independently of) the LLM. It looks at
//! the fragment's canonical locator first and falls back to the opening of
//! the excerpt, trying the patterns preferred for the fragment's authority
//! before all others.

use std::collections::HashMap;
use std::fmt;

use buildkg_profile::{
    compile_exclusions, compile_patterns, DomainProfile, IdExtractionConfig, NamedPattern,
    ProfileError,
};
use regex::Regex;
use serde::Serialize;

/// Placeholder returned when no identifier was found
pub const UNKNOWN_ID: &str = "UNKNOWN";

const LOCATOR_CONFIDENCE: f64 = 0.95;
const DIRECT_LOCATOR_CONFIDENCE: f64 = 0.80;
const AUTHORITY_CONFIDENCE: f64 = 0.85;
const FALLBACK_CONFIDENCE: f64 = 0.70;
const TEXT_WINDOW_CHARS: usize = 500;
const MAX_ID_CHARS: usize = 50;

/// Where an identifier came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Taken from the fragment's canonical locator
    CanonicalLocator,
    /// Found in the excerpt text
    Regex,
    /// Nothing matched
    None,
}

impl ExtractionMethod {
    /// Wire name of the method
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::CanonicalLocator => "canonical_locator",
            ExtractionMethod::Regex => "regex",
            ExtractionMethod::None => "none",
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of ID extraction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    /// Extracted identifier, or [`UNKNOWN_ID`]
    pub provision_id: String,
    /// 0.0 - 1.0
    pub confidence: f64,
    /// How the identifier was found
    pub method: ExtractionMethod,
    /// Pattern that produced the match (`direct` for a verbatim locator)
    pub pattern_name: Option<String>,
}

impl ExtractionResult {
    fn unknown(method: ExtractionMethod) -> Self {
        Self {
            provision_id: UNKNOWN_ID.to_string(),
            confidence: 0.0,
            method,
            pattern_name: None,
        }
    }

    fn found(id: String, confidence: f64, method: ExtractionMethod, pattern: &str) -> Self {
        Self {
            provision_id: id,
            confidence,
            method,
            pattern_name: Some(pattern.to_string()),
        }
    }

    /// Whether no identifier was found
    pub fn is_unknown(&self) -> bool {
        self.provision_id == UNKNOWN_ID
    }
}

/// Extracts provision IDs with compiled profile patterns.
///
/// # Examples
///
/// ```
/// use buildkg_extractor::{ExtractionMethod, ProvisionIdExtractor};
///
/// let extractor = ProvisionIdExtractor::builtin().unwrap();
/// let result = extractor.extract(
///     "Section 101.61 requires that sodium content...",
///     None,
///     "Health Canada",
/// );
/// assert_eq!(result.provision_id, "101.61");
/// assert_eq!(result.method, ExtractionMethod::Regex);
/// ```
#[derive(Debug, Clone)]
pub struct ProvisionIdExtractor {
    patterns: Vec<NamedPattern>,
    authority_priorities: HashMap<String, Vec<String>>,
    exclusions: Vec<Regex>,
}

impl ProvisionIdExtractor {
    /// Compile an explicit pattern configuration.
    pub fn from_config(config: &IdExtractionConfig) -> Result<Self, ProfileError> {
        Ok(Self {
            patterns: compile_patterns(config)?,
            authority_priorities: config
                .authority_priorities
                .iter()
                .map(|(authority, names)| (authority.clone(), names.clone()))
                .collect(),
            exclusions: compile_exclusions(&config.exclusions)?,
        })
    }

    /// Built-in citation patterns.
    pub fn builtin() -> Result<Self, ProfileError> {
        Self::from_config(&IdExtractionConfig::builtin())
    }

    /// Patterns from a profile; profiles that declare none get the built-ins.
    pub fn from_profile(profile: &DomainProfile) -> Result<Self, ProfileError> {
        if profile.id_patterns.patterns.is_empty() {
            Self::builtin()
        } else {
            Self::from_config(&profile.id_patterns)
        }
    }

    /// Names of the compiled patterns, in trial order
    pub fn pattern_names(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.name.as_str())
    }

    /// Extract an ID from a canonical locator string.
    pub fn extract_from_canonical_locator(&self, locator: &str) -> ExtractionResult {
        let locator = locator.trim();
        if locator.is_empty() {
            return ExtractionResult::unknown(ExtractionMethod::CanonicalLocator);
        }

        for pattern in &self.patterns {
            if let Some(id) = pattern.find_id(locator) {
                if !self.is_excluded(&id) {
                    return ExtractionResult::found(
                        id,
                        LOCATOR_CONFIDENCE,
                        ExtractionMethod::CanonicalLocator,
                        &pattern.name,
                    );
                }
            }
        }

        if looks_like_id(locator) {
            return ExtractionResult::found(
                locator.to_string(),
                DIRECT_LOCATOR_CONFIDENCE,
                ExtractionMethod::CanonicalLocator,
                "direct",
            );
        }

        ExtractionResult::unknown(ExtractionMethod::CanonicalLocator)
    }

    /// Extract an ID from the first 500 characters of `text`.
    pub fn extract_from_text(&self, text: &str, authority: &str) -> ExtractionResult {
        if text.is_empty() {
            return ExtractionResult::unknown(ExtractionMethod::Regex);
        }
        let window = match text.char_indices().nth(TEXT_WINDOW_CHARS) {
            Some((end, _)) => &text[..end],
            None => text,
        };

        let preferred: &[String] = self
            .authority_priorities
            .get(authority)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let preferred_patterns = preferred
            .iter()
            .filter_map(|name| self.patterns.iter().find(|p| &p.name == name))
            .map(|p| (p, AUTHORITY_CONFIDENCE));
        let remaining_patterns = self
            .patterns
            .iter()
            .filter(|p| !preferred.contains(&p.name))
            .map(|p| (p, FALLBACK_CONFIDENCE));

        for (pattern, confidence) in preferred_patterns.chain(remaining_patterns) {
            if let Some(id) = pattern.find_id(window) {
                if !self.is_excluded(&id) {
                    return ExtractionResult::found(
                        id,
                        confidence,
                        ExtractionMethod::Regex,
                        &pattern.name,
                    );
                }
            }
        }

        ExtractionResult::unknown(ExtractionMethod::Regex)
    }

    /// Extract an ID using the locator first, then the text.
    ///
    /// A locator result wins whenever it found something with confidence of
    /// at least 0.80.
    pub fn extract(
        &self,
        text: &str,
        canonical_locator: Option<&str>,
        authority: &str,
    ) -> ExtractionResult {
        if let Some(locator) = canonical_locator.filter(|l| !l.is_empty()) {
            let result = self.extract_from_canonical_locator(locator);
            if !result.is_unknown() && result.confidence >= DIRECT_LOCATOR_CONFIDENCE {
                return result;
            }
        }

        let result = self.extract_from_text(text, authority);
        if !result.is_unknown() {
            return result;
        }

        ExtractionResult::unknown(ExtractionMethod::None)
    }

    fn is_excluded(&self, candidate: &str) -> bool {
        self.exclusions.iter().any(|exclusion| exclusion.is_match(candidate))
    }
}

/// Length 2-30, at least one digit, at least one letter or dot.
fn looks_like_id(text: &str) -> bool {
    let len = text.chars().count();
    if !(2..=30).contains(&len) {
        return false;
    }
    text.chars().any(|c| c.is_ascii_digit())
        && text.chars().any(|c| c.is_ascii_alphabetic() || c == '.')
}

/// Outcome of [`ProvisionIdValidator::validate`]
pub type Validation = (bool, String);

/// Permissive format check for extracted IDs.
///
/// Accepts most shapes; rejects only what is clearly not a citation.
#[derive(Debug, Clone)]
pub struct ProvisionIdValidator {
    format_rules: Vec<(String, Vec<Regex>)>,
}

impl ProvisionIdValidator {
    /// Compile the format rules of a pattern configuration.
    pub fn from_config(config: &IdExtractionConfig) -> Result<Self, ProfileError> {
        let format_rules = config
            .format_rules
            .iter()
            .map(|(authority, patterns)| {
                let compiled = patterns
                    .iter()
                    .map(|pattern| {
                        Regex::new(pattern).map_err(|e| ProfileError::Regex {
                            name: format!("format_rules.{}", authority),
                            message: e.to_string(),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((authority.clone(), compiled))
            })
            .collect::<Result<Vec<_>, ProfileError>>()?;
        Ok(Self { format_rules })
    }

    /// Built-in format rules (CFIA, Health Canada, CFR).
    pub fn builtin() -> Result<Self, ProfileError> {
        Self::from_config(&IdExtractionConfig::builtin())
    }

    /// Rules from a profile; profiles that declare none get the built-ins.
    pub fn from_profile(profile: &DomainProfile) -> Result<Self, ProfileError> {
        if profile.id_patterns.format_rules.is_empty() {
            Self::builtin()
        } else {
            Self::from_config(&profile.id_patterns)
        }
    }

    /// Check an extracted ID, returning whether it is acceptable and why.
    pub fn validate(&self, provision_id: &str, authority: &str) -> Validation {
        if provision_id == UNKNOWN_ID {
            return (true, "UNKNOWN is valid placeholder".to_string());
        }

        let len = provision_id.chars().count();
        if len == 0 {
            return (false, "Empty".to_string());
        }
        if len > MAX_ID_CHARS {
            return (false, "Too long".to_string());
        }

        if is_digits(provision_id) {
            return if len <= 5 {
                (true, "Valid numeric section".to_string())
            } else {
                (false, "Numeric but too long (likely not an ID)".to_string())
            };
        }

        if is_dotted_numeric(provision_id) {
            return (true, "Valid dotted numeric format".to_string());
        }

        if let Some((_, rules)) = self.format_rules.iter().find(|(name, _)| name == authority) {
            let matches_format = rules
                .iter()
                .any(|rule| rule.find(provision_id).is_some_and(|m| m.start() == 0));
            if matches_format {
                return (true, format!("Matches {} format", authority));
            }
        }

        if !provision_id.chars().any(|c| c.is_ascii_digit()) {
            return (false, "Must contain at least one digit".to_string());
        }
        if provision_id.chars().any(|c| c.is_ascii_alphabetic()) {
            return (true, "Contains letters and digits".to_string());
        }
        if provision_id.contains('.') {
            return (true, "Contains dot separator".to_string());
        }
        (true, "Passes relaxed validation".to_string())
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

fn is_dotted_numeric(s: &str) -> bool {
    let mut parts = s.split('.');
    let first_ok = parts.next().is_some_and(is_digits);
    let rest: Vec<&str> = parts.collect();
    first_ok && !rest.is_empty() && rest.iter().all(|part| is_digits(part))
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildkg_profile::IdPatternConfig;

    fn extractor() -> ProvisionIdExtractor {
        ProvisionIdExtractor::builtin().unwrap()
    }

    #[test]
    fn test_cfia_locator() {
        let result = extractor().extract(
            "B.01.008.2 The product must contain...",
            Some("B.01.008.2"),
            "CFIA",
        );
        assert_eq!(result.provision_id, "B.01.008.2");
        assert!(result.confidence >= 0.80);
        assert_eq!(result.method, ExtractionMethod::CanonicalLocator);
        assert_eq!(result.pattern_name.as_deref(), Some("cfia_bdot"));
    }

    #[test]
    fn test_health_canada_section_from_text() {
        let result = extractor().extract(
            "Section 101.61 requires that sodium content...",
            Some(""),
            "Health Canada",
        );
        assert_eq!(result.provision_id, "101.61");
        assert_eq!(result.method, ExtractionMethod::Regex);
        assert!((result.confidence - 0.85).abs() < f64::EPSILON);
        assert_eq!(result.pattern_name.as_deref(), Some("section_numbered"));
    }

    #[test]
    fn test_cfr_locator() {
        let result = extractor().extract(
            "21 CFR 101.61 specifies labeling requirements...",
            Some("21 CFR 101.61"),
            "CFR",
        );
        assert_eq!(result.provision_id, "21 CFR 101.61");
        assert_eq!(result.method, ExtractionMethod::CanonicalLocator);
    }

    #[test]
    fn test_chapter_locator() {
        let result = extractor().extract(
            "Chapter 27 of the regulations states...",
            Some("Chapter 27"),
            "Department of Justice",
        );
        assert_eq!(result.provision_id, "27");
        assert_eq!(result.pattern_name.as_deref(), Some("chapter"));
    }

    #[test]
    fn test_year_only_is_unknown() {
        let result = extractor().extract(
            "In 2023 the committee reviewed the labelling rules for imported goods.",
            None,
            "CFIA",
        );
        assert!(result.is_unknown());
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.method, ExtractionMethod::None);
    }

    #[test]
    fn test_unlisted_authority_uses_fallback_confidence() {
        let result = extractor().extract("See Article 12 for details.", None, "Somebody Else");
        assert_eq!(result.provision_id, "12");
        assert!((result.confidence - 0.70).abs() < f64::EPSILON);
    }

    #[test]
    fn test_direct_locator_fallback() {
        let result = extractor().extract_from_canonical_locator("Annex 4b");
        assert_eq!(result.provision_id, "Annex 4b");
        assert!((result.confidence - 0.80).abs() < f64::EPSILON);
        assert_eq!(result.pattern_name.as_deref(), Some("direct"));
    }

    #[test]
    fn test_locator_without_digits_falls_through_to_text() {
        let result = extractor().extract("Section 5 applies.", Some("Preamble"), "Health Canada");
        assert_eq!(result.provision_id, "5");
        assert_eq!(result.method, ExtractionMethod::Regex);
    }

    #[test]
    fn test_text_window_is_500_chars() {
        let text = format!("{} Section 42", "word ".repeat(120));
        let result = extractor().extract_from_text(&text, "Health Canada");
        assert!(result.is_unknown());
    }

    #[test]
    fn test_exclusion_is_full_match() {
        let mut config = IdExtractionConfig::default();
        config
            .patterns
            .insert("number".to_string(), IdPatternConfig::exact(r"(\d+\s*mg)"));
        config
            .patterns
            .insert("code".to_string(), IdPatternConfig::exact(r"(\d{4}-A)"));
        let extractor = ProvisionIdExtractor::from_config(&config).unwrap();

        assert!(extractor.extract_from_text("Take 20 mg daily", "X").is_unknown());
        assert_eq!(extractor.extract_from_text("Rule 2019-A", "X").provision_id, "2019-A");
    }

    #[test]
    fn test_profile_without_patterns_uses_builtin() {
        let profile = DomainProfile::named("bare");
        let extractor = ProvisionIdExtractor::from_profile(&profile).unwrap();
        assert_eq!(extractor.pattern_names().count(), 10);
        assert_eq!(extractor.pattern_names().next(), Some("cfia_bdot"));
    }

    #[test]
    fn test_validator() {
        let validator = ProvisionIdValidator::builtin().unwrap();
        let cases = [
            ("UNKNOWN", "CFIA", true),
            ("", "CFIA", false),
            ("88", "CFIA", true),
            ("1234567", "CFIA", false),
            ("101.61", "Health Canada", true),
            ("B.01.008", "CFIA", true),
            ("Section 12", "Health Canada", true),
            ("Preamble", "CFIA", false),
            ("12-3", "CFIA", true),
        ];
        for (id, authority, expected) in cases {
            let (valid, reason) = validator.validate(id, authority);
            assert_eq!(valid, expected, "{} -> {}", id, reason);
        }
        assert_eq!(validator.validate(&"1".repeat(51), "CFIA").1, "Too long");
        assert_eq!(validator.validate("B.01.008", "CFIA").1, "Matches CFIA format");
    }
}
