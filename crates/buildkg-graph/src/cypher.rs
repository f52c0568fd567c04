//! Cypher rendering for Apache AGE
//!
//! Every value that reaches query text goes through [`escape_cypher`];
//! every label and property key goes through [`sanitize_identifier`].

use buildkg_domain::{GraphMutation, PropertyValue, VertexRef};

/// Escape a string for a single-quoted Cypher literal.
///
/// Backslashes and both quote characters are backslash-escaped; newlines
/// become spaces.
pub fn escape_cypher(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push(' '),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Reduce a label or key to `[A-Za-z0-9_]`, never starting with a digit.
pub fn sanitize_identifier(raw: &str) -> String {
    let mut ident: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    ident
}

fn render_value(value: &PropertyValue) -> String {
    match value {
        PropertyValue::String(s) => format!("'{}'", escape_cypher(s)),
        PropertyValue::Integer(n) => n.to_string(),
        PropertyValue::Float(f) if f.is_finite() => f.to_string(),
        PropertyValue::Float(_) => "null".to_string(),
        PropertyValue::Bool(b) => b.to_string(),
    }
}

/// Render a property map literal: `{key: value, ...}`
pub fn render_properties(properties: &[(String, PropertyValue)]) -> String {
    let parts: Vec<String> = properties
        .iter()
        .map(|(key, value)| format!("{}: {}", sanitize_identifier(key), render_value(value)))
        .collect();
    format!("{{{}}}", parts.join(", "))
}

fn render_match(alias: &str, vertex: &VertexRef) -> String {
    format!(
        "({}:{} {{id: '{}'}})",
        alias,
        sanitize_identifier(&vertex.label),
        escape_cypher(&vertex.id)
    )
}

/// The Cypher body for one mutation, plus the AGE result column it returns.
pub fn render_cypher(mutation: &GraphMutation) -> (String, &'static str) {
    match mutation {
        GraphMutation::CreateVertex { label, properties } => (
            format!(
                "CREATE (n:{} {}) RETURN id(n)",
                sanitize_identifier(label),
                render_properties(properties)
            ),
            "node_id",
        ),
        GraphMutation::MergeVertex {
            label,
            id,
            properties,
        } => {
            let assignments: Vec<String> = properties
                .iter()
                .filter(|(key, _)| key != "id")
                .map(|(key, value)| {
                    format!("n.{} = {}", sanitize_identifier(key), render_value(value))
                })
                .collect();
            let set_clause = if assignments.is_empty() {
                String::new()
            } else {
                format!(" SET {}", assignments.join(", "))
            };
            (
                format!(
                    "MERGE (n:{} {{id: '{}'}}){} RETURN id(n)",
                    sanitize_identifier(label),
                    escape_cypher(id),
                    set_clause
                ),
                "node_id",
            )
        }
        GraphMutation::CreateEdge { label, from, to } => (
            format!(
                "MATCH {}, {} CREATE (a)-[:{}]->(b)",
                render_match("a", from),
                render_match("b", to),
                sanitize_identifier(label)
            ),
            "result",
        ),
        GraphMutation::MergeEdge { label, from, to } => (
            format!(
                "MATCH {}, {} MERGE (a)-[:{}]->(b)",
                render_match("a", from),
                render_match("b", to),
                sanitize_identifier(label)
            ),
            "result",
        ),
    }
}

/// Pick a dollar-quote delimiter that does not occur in `body`.
fn dollar_tag(body: &str) -> String {
    if !body.contains("$$") {
        return "$$".to_string();
    }
    let mut n = 0usize;
    loop {
        let tag = if n == 0 {
            "$cypher$".to_string()
        } else {
            format!("$cypher{}$", n)
        };
        if !body.contains(&tag) {
            return tag;
        }
        n += 1;
    }
}

/// Wrap a mutation in the SQL statement AGE executes.
pub fn render_statement(graph_name: &str, mutation: &GraphMutation) -> String {
    let (body, column) = render_cypher(mutation);
    let tag = dollar_tag(&body);
    format!(
        "SELECT * FROM cypher('{}', {tag} {} {tag}) as ({} agtype);",
        sanitize_identifier(graph_name),
        body,
        column,
        tag = tag
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Inverse of `escape_cypher` for inputs without newlines.
    fn unescape(escaped: &str) -> String {
        let mut out = String::new();
        let mut chars = escaped.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    #[test]
    fn test_escape_rules() {
        assert_eq!(escape_cypher(r"a\b"), r"a\\b");
        assert_eq!(escape_cypher("it's"), r"it\'s");
        assert_eq!(escape_cypher("say \"hi\""), r#"say \"hi\""#);
        assert_eq!(escape_cypher("line one\nline two"), "line one line two");
    }

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("Provision"), "Provision");
        assert_eq!(sanitize_identifier("Data Category"), "Data_Category");
        assert_eq!(sanitize_identifier("x) DETACH DELETE (n"), "x__DETACH_DELETE__n");
        assert_eq!(sanitize_identifier("1st"), "_1st");
        assert_eq!(sanitize_identifier(""), "_");
    }

    #[test]
    fn test_create_vertex_statement() {
        let mutation = GraphMutation::CreateVertex {
            label: "Provision".to_string(),
            properties: vec![
                ("id".to_string(), "Provision_abc_0".into()),
                ("threshold".to_string(), PropertyValue::Integer(5)),
                ("ratio".to_string(), PropertyValue::Float(0.5)),
                ("active".to_string(), PropertyValue::Bool(true)),
            ],
        };
        assert_eq!(
            render_statement("knowledge_graph", &mutation),
            "SELECT * FROM cypher('knowledge_graph', $$ CREATE (n:Provision {id: 'Provision_abc_0', threshold: 5, ratio: 0.5, active: true}) RETURN id(n) $$) as (node_id agtype);"
        );
    }

    #[test]
    fn test_create_edge_statement() {
        let mutation = GraphMutation::CreateEdge {
            label: "DERIVED_FROM".to_string(),
            from: VertexRef {
                label: "Requirement".to_string(),
                id: "Requirement_abc_1".to_string(),
            },
            to: VertexRef {
                label: "Provision".to_string(),
                id: "Provision_abc_0".to_string(),
            },
        };
        assert_eq!(
            render_statement("kg", &mutation),
            "SELECT * FROM cypher('kg', $$ MATCH (a:Requirement {id: 'Requirement_abc_1'}), (b:Provision {id: 'Provision_abc_0'}) CREATE (a)-[:DERIVED_FROM]->(b) $$) as (result agtype);"
        );
    }

    #[test]
    fn test_merge_vertex_sets_non_id_properties() {
        let mutation = GraphMutation::MergeVertex {
            label: "Entity".to_string(),
            id: "Entity_f_0".to_string(),
            properties: vec![
                ("id".to_string(), "Entity_f_0".into()),
                ("name".to_string(), "O'Brien".into()),
            ],
        };
        let (body, column) = render_cypher(&mutation);
        assert_eq!(
            body,
            r"MERGE (n:Entity {id: 'Entity_f_0'}) SET n.name = 'O\'Brien' RETURN id(n)"
        );
        assert_eq!(column, "node_id");
    }

    #[test]
    fn test_dollar_quotes_in_values_change_the_delimiter() {
        let mutation = GraphMutation::CreateVertex {
            label: "Entity".to_string(),
            properties: vec![("text".to_string(), "costs $$ money".into())],
        };
        let statement = render_statement("kg", &mutation);
        assert!(statement.starts_with("SELECT * FROM cypher('kg', $cypher$ CREATE"));
        assert!(statement.ends_with("$cypher$) as (node_id agtype);"));
    }

    #[test]
    fn test_non_finite_float_renders_null() {
        let props = vec![("x".to_string(), PropertyValue::Float(f64::NAN))];
        assert_eq!(render_properties(&props), "{x: null}");
    }

    proptest! {
        #[test]
        fn prop_escape_round_trips_without_newlines(s in "[^\n]{0,40}") {
            prop_assert_eq!(unescape(&escape_cypher(&s)), s);
        }

        #[test]
        fn prop_escaped_has_no_bare_quote(s in "\\PC{0,40}") {
            let escaped = escape_cypher(&s);
            let chars: Vec<char> = escaped.chars().collect();
            for (i, c) in chars.iter().enumerate() {
                if *c == '\'' {
                    // Count the backslashes immediately before the quote.
                    let slashes = chars[..i].iter().rev().take_while(|c| **c == '\\').count();
                    prop_assert!(slashes % 2 == 1);
                }
            }
        }
    }
}
