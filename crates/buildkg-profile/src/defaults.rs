//! Built-in identifier patterns used when a profile declares none

use indexmap::IndexMap;

use crate::model::{IdExtractionConfig, IdPatternConfig};

impl IdExtractionConfig {
    /// Citation patterns for common regulatory styles (CFIA, CFR, numbered
    /// sections, chapters, articles, schedules) with their authority
    /// priorities and validator format rules.
    pub fn builtin() -> Self {
        let mut patterns = IndexMap::new();
        let mut add = |name: &str, config: IdPatternConfig| {
            patterns.insert(name.to_string(), config);
        };
        add("cfia_bdot", IdPatternConfig::ignore_case(r"\b([A-Z]\.\d{2}\.\d{3}(?:\.\d+)?)\b"));
        add("cfia_cdot", IdPatternConfig::ignore_case(r"\b([A-Z]\.\d{2,3})\b"));
        add("cfr_full", IdPatternConfig::ignore_case(r"\b(\d{1,2}\s*CFR\s*\d+(?:\.\d+)*)\b"));
        add("cfr_section", IdPatternConfig::ignore_case(r"\b§\s*(\d+\.\d+)\b"));
        add("section_numbered", IdPatternConfig::ignore_case(r"\bSection\s+(\d+(?:\.\d+)*)\b"));
        add("subsection", IdPatternConfig::exact(r"\b(\d+(?:\.\d+){2,})\b"));
        add("chapter", IdPatternConfig::ignore_case(r"\bChapter\s+([A-Z]?\d+)\b"));
        add("article", IdPatternConfig::ignore_case(r"\bArticle\s+(\d+(?:\.\d+)*)\b"));
        add("parenthetical", IdPatternConfig::ignore_case(r"\(([A-Z]\d+(?:\.\d+)+)\)"));
        add("schedule", IdPatternConfig::ignore_case(r"\bSchedule\s+([IVX]+|[A-Z]|\d+)\b"));

        let priorities: [(&str, &[&str]); 5] = [
            ("CFIA", &["cfia_bdot", "cfia_cdot", "section_numbered", "parenthetical"]),
            ("Health Canada", &["section_numbered", "cfia_bdot", "schedule"]),
            ("Department of Justice", &["chapter", "section_numbered", "article"]),
            ("Canadian General Standards Board", &["section_numbered", "cfia_cdot"]),
            ("World Health Organization", &["article", "section_numbered"]),
        ];
        let format_rules: [(&str, &[&str]); 3] = [
            ("CFIA", &[r"^[A-Z]\.\d{2}\.\d{3}(?:\.\d+)?$", r"^[A-Z]\.\d{2,3}$"]),
            ("Health Canada", &[r"(?i)^Section\s+\d+(?:\.\d+)*$", r"(?i)^Schedule\s+[IVX]+$"]),
            ("CFR", &[r"(?i)^\d{1,2}\s*CFR\s*\d+(?:\.\d+)*$", r"^\d+\.\d+(?:\.\d+)*$"]),
        ];

        Self {
            patterns,
            authority_priorities: to_map(&priorities),
            format_rules: to_map(&format_rules),
            ..Self::default()
        }
    }
}

fn to_map(entries: &[(&str, &[&str])]) -> IndexMap<String, Vec<String>> {
    entries
        .iter()
        .map(|(key, values)| {
            (
                key.to_string(),
                values.iter().map(|v| v.to_string()).collect(),
            )
        })
        .collect()
}
