//! Output formatting for the CLI.

use buildkg_domain::{BatchSnapshot, RunStats};
use buildkg_extractor::{ExtractionResult, Validation};
use buildkg_profile::DomainProfile;
use colored::*;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

const RULE_WIDTH: usize = 70;

/// Output formatter.
pub struct Formatter {
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(color_enabled: bool) -> Self {
        Self { color_enabled }
    }

    /// Section banner.
    pub fn header(&self, title: &str) -> String {
        let rule = "=".repeat(RULE_WIDTH);
        format!("{}\n{}\n{}", rule, self.colorize(title, "cyan"), rule)
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Available profiles, marking the selected one.
    pub fn profile_list(&self, names: &[String], selected: &str) -> String {
        if names.is_empty() {
            return self.warning("No profiles found.");
        }
        names
            .iter()
            .map(|name| {
                if name == selected {
                    format!("* {}", self.colorize(name, "green"))
                } else {
                    format!("  {}", name)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Summary of a loaded profile.
    pub fn profile_details(&self, profile: &DomainProfile) -> String {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        builder.push_record(["Name", profile.name.as_str()]);
        builder.push_record(["Version", profile.version.as_str()]);
        builder.push_record(["Extends", profile.extends.as_deref().unwrap_or("-")]);
        builder.push_record(["Description", profile.description.as_str()]);
        builder.push_record([
            "ID patterns".to_string(),
            profile
                .id_patterns
                .patterns
                .keys()
                .cloned()
                .collect::<Vec<_>>()
                .join(", "),
        ]);
        builder.push_record([
            "Ontology nodes".to_string(),
            profile
                .ontology
                .nodes
                .iter()
                .map(|n| n.label.clone())
                .collect::<Vec<_>>()
                .join(", "),
        ]);
        builder.push_record([
            "Ontology edges".to_string(),
            profile
                .ontology
                .edges
                .iter()
                .map(|e| e.label.clone())
                .collect::<Vec<_>>()
                .join(", "),
        ]);
        builder.push_record([
            "Root node",
            if profile.ontology.root_node.is_empty() {
                "-"
            } else {
                profile.ontology.root_node.as_str()
            },
        ]);
        builder.push_record([
            "Sub-domains".to_string(),
            profile.discovery.sub_domains.len().to_string(),
        ]);
        self.table(builder)
    }

    /// Provision id extraction result with its validation.
    pub fn extraction(&self, result: &ExtractionResult, validation: &Validation) -> String {
        let (valid, reason) = validation;
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        builder.push_record(["Provision ID", result.provision_id.as_str()]);
        builder.push_record(["Confidence".to_string(), format!("{:.2}", result.confidence)]);
        builder.push_record(["Method", result.method.as_str()]);
        builder.push_record(["Pattern", result.pattern_name.as_deref().unwrap_or("-")]);
        let verdict = if *valid {
            self.colorize("valid", "green")
        } else {
            self.colorize("invalid", "red")
        };
        builder.push_record(["Validation".to_string(), format!("{} ({})", verdict, reason)]);
        self.table(builder)
    }

    /// Batch status with whatever counters the provider reports.
    pub fn snapshot(&self, snapshot: &BatchSnapshot) -> String {
        let mut lines = vec![
            format!("Batch ID: {}", snapshot.batch_id),
            format!(
                "Status: {} ({})",
                self.colorize(&snapshot.provider_status, status_color(snapshot)),
                snapshot.status
            ),
        ];

        let counts = snapshot.counts.entries();
        if !counts.is_empty() {
            let mut builder = Builder::default();
            builder.push_record(["Requests", "Count"]);
            for (name, value) in counts {
                builder.push_record([name.to_string(), value.to_string()]);
            }
            lines.push(self.table(builder));
        }
        lines.join("\n")
    }

    /// Final run summary. A non-zero failure count is always highlighted.
    pub fn stats(&self, stats: &RunStats) -> String {
        let mut builder = Builder::default();
        builder.push_record(["Outcome", "Fragments"]);
        builder.push_record(["Success".to_string(), stats.success.to_string()]);
        let failed = stats.failed.to_string();
        builder.push_record([
            "Failed".to_string(),
            if stats.failed > 0 {
                self.colorize(&failed, "red")
            } else {
                failed
            },
        ]);
        builder.push_record(["Skipped".to_string(), stats.skipped.to_string()]);
        builder.push_record(["Total".to_string(), stats.total().to_string()]);

        let table = self.table(builder);
        if stats.failed > 0 {
            format!(
                "{}\n{}",
                table,
                self.warning(&format!("{} fragment(s) failed", stats.failed))
            )
        } else {
            table
        }
    }

    fn table(&self, builder: Builder) -> String {
        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            _ => text.to_string(),
        }
    }
}

fn status_color(snapshot: &BatchSnapshot) -> &'static str {
    if snapshot.status.is_success() {
        "green"
    } else if snapshot.status.is_terminal() {
        "red"
    } else {
        "yellow"
    }
}
