//! Ontology-driven prompt rendering
//!
//! Rendering is a pure function of the excerpt, its provenance and the
//! ontology, so prepared batch files are reproducible.

use buildkg_profile::{DomainProfile, OntologyConfig, ParsingConfig};

use crate::error::ExtractorError;

/// Builds `(system_message, user_prompt)` pairs from an ontology
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system_message: String,
    ontology: OntologyConfig,
    json_schema: String,
}

impl PromptBuilder {
    /// Bind a system message and an ontology.
    ///
    /// Fails unless the ontology declares nodes and a `json_schema`.
    pub fn new(parsing: &ParsingConfig, ontology: OntologyConfig) -> Result<Self, ExtractorError> {
        let json_schema = match &ontology.json_schema {
            Some(schema) if !ontology.nodes.is_empty() && !schema.trim().is_empty() => {
                schema.clone()
            }
            _ => {
                return Err(ExtractorError::Config(
                    "Ontology with nodes and json_schema is required".to_string(),
                ))
            }
        };
        Ok(Self {
            system_message: parsing.system_message.clone(),
            ontology,
            json_schema,
        })
    }

    /// Use an explicit ontology if given, otherwise the profile's own.
    pub fn for_profile(
        profile: &DomainProfile,
        ontology: Option<OntologyConfig>,
    ) -> Result<Self, ExtractorError> {
        let ontology = ontology.unwrap_or_else(|| profile.ontology.clone());
        Self::new(&profile.parsing, ontology)
    }

    /// The bound ontology
    pub fn ontology(&self) -> &OntologyConfig {
        &self.ontology
    }

    /// Label for entities that carry no `_label`
    pub fn root_node(&self) -> &str {
        &self.ontology.root_node
    }

    /// Render the prompt for one excerpt.
    ///
    /// Empty `authority` / `jurisdiction` are treated as absent.
    pub fn build(&self, excerpt: &str, authority: &str, jurisdiction: &str) -> (String, String) {
        let node_descriptions = self
            .ontology
            .nodes
            .iter()
            .map(|node| {
                let mut line = format!("- **{}**: {}", node.label, node.description);
                if !node.properties.is_empty() {
                    let properties: Vec<String> = node
                        .properties
                        .iter()
                        .map(|(name, kind)| format!("`{}` [{}]", name, kind))
                        .collect();
                    line.push_str(&format!(" (Properties: {})", properties.join(", ")));
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n");

        let edge_descriptions = self
            .ontology
            .edges
            .iter()
            .map(|edge| {
                format!(
                    "- **{}**: {} → {} ({})",
                    edge.label, edge.source, edge.target, edge.description
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let source_context = match (authority.is_empty(), jurisdiction.is_empty()) {
            (false, false) => format!("\n\nSource: {} ({})", authority, jurisdiction),
            (false, true) => format!("\n\nSource: {}", authority),
            _ => String::new(),
        };

        let user_prompt = format!(
            "Extract structured knowledge from the text below according to this ontology.\n\
             \n\
             **Node types:**\n\
             {nodes}\n\
             \n\
             **Relationships:**\n\
             {edges}\n\
             {source}\n\
             \n\
             Text:\n\
             \"\"\"\n\
             {excerpt}\n\
             \"\"\"\n\
             \n\
             Respond with valid JSON in this exact format:\n\
             {schema}\n\
             \n\
             If no meaningful entities are found, return minimal valid JSON with empty arrays.",
            nodes = node_descriptions,
            edges = edge_descriptions,
            source = source_context,
            excerpt = excerpt,
            schema = self.json_schema,
        );

        (self.system_message.clone(), user_prompt)
    }
}

/// Render a prompt from a profile and an optional explicit ontology.
pub fn build_prompt(
    excerpt: &str,
    authority: &str,
    jurisdiction: &str,
    profile: &DomainProfile,
    ontology: Option<&OntologyConfig>,
) -> Result<(String, String), ExtractorError> {
    let builder = PromptBuilder::for_profile(profile, ontology.cloned())?;
    Ok(builder.build(excerpt, authority, jurisdiction))
}

/// Fill a profile's `prompt_template`.
///
/// Placeholders are `{authority}`, `{jurisdiction}`, `{excerpt}`,
/// `{requirement_types}`, `{deontic_modalities}`, `{constraint_logic_types}`,
/// `{target_signal_examples}` and `{scope_examples}`; `{{` and `}}` are
/// literal braces.
pub fn render_prompt_template(
    template: &str,
    parsing: &ParsingConfig,
    excerpt: &str,
    authority: &str,
    jurisdiction: &str,
) -> Result<String, ExtractorError> {
    let quoted = |items: &[String]| {
        items
            .iter()
            .map(|item| format!("\"{}\"", item))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let value = |name: &str| -> Option<String> {
        Some(match name {
            "authority" => authority.to_string(),
            "jurisdiction" => jurisdiction.to_string(),
            "excerpt" => excerpt.to_string(),
            "requirement_types" => parsing.requirement_types.join(", "),
            "deontic_modalities" => parsing.deontic_modalities.join(", "),
            "constraint_logic_types" => parsing.constraint_logic_types.join(", "),
            "target_signal_examples" => quoted(&parsing.target_signal_examples),
            "scope_examples" => quoted(&parsing.scope_examples),
            _ => return None,
        })
    };

    let mut out = String::with_capacity(template.len() + excerpt.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => name.push(ch),
                        None => {
                            return Err(ExtractorError::Config(
                                "Unterminated placeholder in prompt_template".to_string(),
                            ))
                        }
                    }
                }
                let replacement = value(name.trim()).ok_or_else(|| {
                    ExtractorError::Config(format!(
                        "Unknown placeholder '{{{}}}' in prompt_template",
                        name
                    ))
                })?;
                out.push_str(&replacement);
            }
            '}' => {
                return Err(ExtractorError::Config(
                    "Single '}' encountered in prompt_template".to_string(),
                ))
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildkg_profile::{EdgeDef, NodeDef};

    fn ontology() -> OntologyConfig {
        let mut provision = NodeDef {
            label: "Provision".to_string(),
            description: "A numbered clause".to_string(),
            ..Default::default()
        };
        provision
            .properties
            .insert("id".to_string(), "string".to_string());
        provision
            .properties
            .insert("text".to_string(), "string".to_string());

        OntologyConfig {
            description: "Test ontology".to_string(),
            nodes: vec![
                provision,
                NodeDef {
                    label: "Requirement".to_string(),
                    description: "An obligation".to_string(),
                    ..Default::default()
                },
            ],
            edges: vec![EdgeDef {
                label: "DERIVED_FROM".to_string(),
                source: "Requirement".to_string(),
                target: "Provision".to_string(),
                description: "origin".to_string(),
                ..Default::default()
            }],
            root_node: "Provision".to_string(),
            json_schema: Some("{\"entities\": [], \"relationships\": []}".to_string()),
        }
    }

    fn builder() -> PromptBuilder {
        PromptBuilder::new(&ParsingConfig::default(), ontology()).unwrap()
    }

    #[test]
    fn test_prompt_layout() {
        let (system, prompt) = builder().build("Products must be labelled.", "CFIA", "CA");
        assert_eq!(system, ParsingConfig::default().system_message);

        let expected = "Extract structured knowledge from the text below according to this ontology.\n\
            \n\
            **Node types:**\n\
            - **Provision**: A numbered clause (Properties: `id` [string], `text` [string])\n\
            - **Requirement**: An obligation\n\
            \n\
            **Relationships:**\n\
            - **DERIVED_FROM**: Requirement → Provision (origin)\n\
            \n\
            \n\
            Source: CFIA (CA)\n\
            \n\
            Text:\n\
            \"\"\"\n\
            Products must be labelled.\n\
            \"\"\"\n\
            \n\
            Respond with valid JSON in this exact format:\n\
            {\"entities\": [], \"relationships\": []}\n\
            \n\
            If no meaningful entities are found, return minimal valid JSON with empty arrays.";
        assert_eq!(prompt, expected);
    }

    #[test]
    fn test_source_line_variants() {
        let (_, authority_only) = builder().build("x", "CFIA", "");
        assert!(authority_only.contains("\n\nSource: CFIA\n"));

        let (_, none) = builder().build("x", "", "CA");
        assert!(!none.contains("Source:"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let b = builder();
        assert_eq!(b.build("same", "A", "B"), b.build("same", "A", "B"));
    }

    #[test]
    fn test_missing_schema_is_config_error() {
        let mut ontology = ontology();
        ontology.json_schema = None;
        let err = PromptBuilder::new(&ParsingConfig::default(), ontology).unwrap_err();
        assert!(matches!(err, ExtractorError::Config(_)));
    }

    #[test]
    fn test_missing_nodes_is_config_error() {
        let mut ontology = ontology();
        ontology.nodes.clear();
        assert!(PromptBuilder::new(&ParsingConfig::default(), ontology).is_err());
    }

    #[test]
    fn test_profile_without_ontology_requires_explicit_one() {
        let profile = DomainProfile::named("bare");
        let err = build_prompt("text", "", "", &profile, None).unwrap_err();
        assert!(matches!(err, ExtractorError::Config(_)));

        let explicit = ontology();
        let (_, prompt) = build_prompt("text", "", "", &profile, Some(&explicit)).unwrap();
        assert!(prompt.contains("**Provision**"));
    }

    #[test]
    fn test_explicit_ontology_overrides_profile() {
        let mut profile = DomainProfile::named("p");
        profile.ontology = ontology();
        let mut other = ontology();
        other.nodes.truncate(1);
        other.nodes[0].label = "Clause".to_string();

        let (_, prompt) = build_prompt("text", "", "", &profile, Some(&other)).unwrap();
        assert!(prompt.contains("**Clause**"));
        assert!(!prompt.contains("**Requirement**"));
    }

    #[test]
    fn test_render_prompt_template() {
        let parsing = ParsingConfig {
            requirement_types: vec!["labelling".to_string(), "composition".to_string()],
            scope_examples: vec!["all foods".to_string()],
            ..Default::default()
        };
        let rendered = render_prompt_template(
            "{authority}/{jurisdiction}: {requirement_types}; {scope_examples} {{raw}} {excerpt}",
            &parsing,
            "TEXT",
            "CFIA",
            "CA",
        )
        .unwrap();
        assert_eq!(
            rendered,
            "CFIA/CA: labelling, composition; \"all foods\" {raw} TEXT"
        );
    }

    #[test]
    fn test_render_prompt_template_unknown_placeholder() {
        let result =
            render_prompt_template("{nope}", &ParsingConfig::default(), "x", "a", "j");
        assert!(matches!(result, Err(ExtractorError::Config(_))));
    }
}
