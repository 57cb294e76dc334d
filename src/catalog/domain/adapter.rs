//! Adapter manifest synthesized from a discovered tool surface.

use super::{ParameterSpec, ServerEntry, ToolSchema};
use minijinja::Environment;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Mock response template used when none is configured.
pub const DEFAULT_MOCK_TEMPLATE: &str = "mock response from {{ server }} for {{ tool }}";

/// How a generated adapter answers invocations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterMode {
    /// Plans a remote call against the server's location.
    Client,
    /// Answers locally from the entry's mock response template.
    #[default]
    Mock,
}

impl AdapterMode {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Mock => "mock",
        }
    }
}

/// Errors that prevent a tool surface from becoming an adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// The tool list is empty and empty stubs are not permitted.
    #[error("adapter would expose no callable tools")]
    EmptyToolSurface,

    /// Two tools share the same name.
    #[error("duplicate tool name '{0}'")]
    DuplicateToolName(String),

    /// Two distinct tool names map to the same entry-point identifier.
    #[error("tools '{first}' and '{second}' both map to entry point '{identifier}'")]
    IdentifierCollision {
        /// First tool name.
        first: String,
        /// Second tool name.
        second: String,
        /// Shared identifier.
        identifier: String,
    },

    /// A tool name contains nothing usable as an identifier.
    #[error("tool name '{0}' cannot be turned into an entry point")]
    UnnamableTool(String),

    /// A tool schema cannot be read as a parameter shape.
    #[error("schema for tool '{tool}' is malformed: {reason}")]
    MalformedSchema {
        /// Tool name.
        tool: String,
        /// Diagnostic.
        reason: String,
    },

    /// The mock response template does not compile.
    #[error("mock response template is invalid: {0}")]
    Template(String),

    /// The artifact could not be written or read.
    #[error("adapter artifact I/O failed: {0}")]
    Artifact(String),

    /// The artifact slot already holds a different server's adapter.
    #[error("artifact '{slug}' already belongs to server '{owner}'")]
    ArtifactCollision {
        /// Shared slug.
        slug: String,
        /// Server recorded in the existing artifact.
        owner: String,
    },
}

/// One callable entry point of a generated adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPoint {
    /// Exact tool name as reported by the server.
    pub name: String,
    /// Snake-case identifier derived from the tool name.
    pub identifier: String,
    /// Tool description.
    pub description: String,
    /// Declared parameters in schema order.
    pub parameters: Vec<ParameterSpec>,
    /// Source JSON Schema for the tool input.
    pub input_schema: Value,
    /// Template rendered for mock invocations.
    pub mock_response: String,
}

/// Complete description of a generated adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterManifest {
    /// Server name.
    pub server: String,
    /// Raw server location, when configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Invocation mode.
    pub mode: AdapterMode,
    /// SHA-256 of the serialized entry points.
    pub fingerprint: String,
    /// One entry point per tool, in discovery order.
    pub entry_points: Vec<EntryPoint>,
}

/// Options controlling manifest synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisOptions {
    /// Invocation mode recorded in the manifest.
    pub mode: AdapterMode,
    /// Template used for each entry point's mock response.
    pub mock_template: String,
    /// Whether an adapter with no tools may be produced.
    pub allow_empty: bool,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            mode: AdapterMode::Mock,
            mock_template: DEFAULT_MOCK_TEMPLATE.to_owned(),
            allow_empty: false,
        }
    }
}

impl AdapterManifest {
    /// Synthesizes a manifest for `entry` from its tool list.
    ///
    /// The result depends only on the inputs: the same tools in the same
    /// order always produce an identical manifest and fingerprint.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError`] for an empty tool list (unless
    /// permitted), duplicate names, identifier collisions, malformed
    /// schemas, or an invalid mock template.
    pub fn synthesize(
        entry: &ServerEntry,
        tools: &[ToolSchema],
        options: &SynthesisOptions,
    ) -> Result<Self, GenerationError> {
        if tools.is_empty() && !options.allow_empty {
            return Err(GenerationError::EmptyToolSurface);
        }

        Environment::new()
            .template_from_str(&options.mock_template)
            .map_err(|error| GenerationError::Template(error.to_string()))?;

        let mut by_name: HashSet<&str> = HashSet::with_capacity(tools.len());
        let mut by_identifier: HashMap<String, &str> = HashMap::with_capacity(tools.len());
        let mut entry_points = Vec::with_capacity(tools.len());

        for tool in tools {
            if !by_name.insert(tool.name()) {
                return Err(GenerationError::DuplicateToolName(tool.name().to_owned()));
            }

            let identifier = entry_point_identifier(tool.name())
                .ok_or_else(|| GenerationError::UnnamableTool(tool.name().to_owned()))?;
            if let Some(first) = by_identifier.insert(identifier.clone(), tool.name()) {
                return Err(GenerationError::IdentifierCollision {
                    first: first.to_owned(),
                    second: tool.name().to_owned(),
                    identifier,
                });
            }

            let parameters =
                tool.parameters()
                    .map_err(|reason| GenerationError::MalformedSchema {
                        tool: tool.name().to_owned(),
                        reason,
                    })?;

            entry_points.push(EntryPoint {
                name: tool.name().to_owned(),
                identifier,
                description: tool.description().to_owned(),
                parameters,
                input_schema: tool.input_schema().clone(),
                mock_response: options.mock_template.clone(),
            });
        }

        let fingerprint = fingerprint(&entry_points)?;
        Ok(Self {
            server: entry.name().as_str().to_owned(),
            location: entry.location().map(str::to_owned),
            mode: options.mode,
            fingerprint,
            entry_points,
        })
    }

    /// Finds an entry point by exact tool name.
    #[must_use]
    pub fn entry_point(&self, name: &str) -> Option<&EntryPoint> {
        self.entry_points.iter().find(|point| point.name == name)
    }

    /// Returns the tool names in entry-point order.
    #[must_use]
    pub fn tool_names(&self) -> Vec<&str> {
        self.entry_points
            .iter()
            .map(|point| point.name.as_str())
            .collect()
    }
}

/// Derives a snake-case identifier from a tool name.
///
/// Returns `None` when the name has no ASCII alphanumerics.
#[must_use]
pub fn entry_point_identifier(name: &str) -> Option<String> {
    let mut identifier = String::with_capacity(name.len() + 1);
    let mut previous_was_lower = false;
    for character in name.chars() {
        if character.is_ascii_alphanumeric() {
            if character.is_ascii_uppercase() && previous_was_lower {
                identifier.push('_');
            }
            identifier.push(character.to_ascii_lowercase());
            previous_was_lower = character.is_ascii_lowercase() || character.is_ascii_digit();
        } else {
            if !identifier.is_empty() && !identifier.ends_with('_') {
                identifier.push('_');
            }
            previous_was_lower = false;
        }
    }
    while identifier.ends_with('_') {
        identifier.pop();
    }
    if identifier.is_empty() {
        return None;
    }
    if identifier.starts_with(|character: char| character.is_ascii_digit()) {
        identifier.insert(0, '_');
    }
    Some(identifier)
}

fn fingerprint(entry_points: &[EntryPoint]) -> Result<String, GenerationError> {
    let canonical = serde_json::to_vec(entry_points)
        .map_err(|error| GenerationError::Artifact(error.to_string()))?;
    let digest = Sha256::digest(&canonical);
    Ok(digest.iter().map(|byte| format!("{byte:02x}")).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::domain::ServerName;
    use rstest::rstest;
    use serde_json::json;

    fn entry() -> ServerEntry {
        ServerEntry::new(
            ServerName::new("Calculator").expect("valid server name"),
            Some("stdio:calculator-server".to_owned()),
        )
    }

    fn tool(name: &str) -> ToolSchema {
        ToolSchema::new(
            name,
            format!("Tool {name}"),
            json!({
                "type": "object",
                "properties": {"a": {"type": "number"}, "b": {"type": "number"}},
                "required": ["a"]
            }),
        )
        .expect("valid tool")
    }

    #[test]
    fn synthesis_is_deterministic() {
        let tools = vec![tool("add"), tool("subtract"), tool("multiply")];
        let options = SynthesisOptions::default();

        let first = AdapterManifest::synthesize(&entry(), &tools, &options).expect("synthesis");
        let second = AdapterManifest::synthesize(&entry(), &tools, &options).expect("synthesis");

        assert_eq!(first, second);
        assert_eq!(first.fingerprint.len(), 64);
        assert_eq!(first.tool_names(), vec!["add", "subtract", "multiply"]);
    }

    #[test]
    fn fingerprint_changes_with_tool_surface() {
        let options = SynthesisOptions::default();
        let base = AdapterManifest::synthesize(&entry(), &[tool("add")], &options)
            .expect("synthesis");
        let extended =
            AdapterManifest::synthesize(&entry(), &[tool("add"), tool("divide")], &options)
                .expect("synthesis");

        assert_ne!(base.fingerprint, extended.fingerprint);
    }

    #[test]
    fn entry_points_mirror_parameter_shape() {
        let manifest =
            AdapterManifest::synthesize(&entry(), &[tool("add")], &SynthesisOptions::default())
                .expect("synthesis");
        let point = manifest.entry_point("add").expect("entry point exists");

        let names: Vec<&str> = point.parameters.iter().map(|spec| spec.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(point.parameters.first().is_some_and(|spec| spec.required));
    }

    #[test]
    fn entry_points_keep_declared_parameter_order() {
        let search = ToolSchema::new(
            "search",
            "Search",
            json!({
                "type": "object",
                "properties": {
                    "zeta": {"type": "string"},
                    "alpha": {"type": "integer"},
                    "mid": {"type": "boolean"}
                },
                "required": ["zeta"]
            }),
        )
        .expect("valid tool");

        let manifest =
            AdapterManifest::synthesize(&entry(), &[search], &SynthesisOptions::default())
                .expect("synthesis");
        let point = manifest.entry_point("search").expect("entry point exists");

        let names: Vec<&str> = point.parameters.iter().map(|spec| spec.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        let stored: Vec<&str> = point
            .input_schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|properties| properties.keys().map(String::as_str).collect())
            .unwrap_or_default();
        assert_eq!(stored, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn empty_tool_list_fails_unless_permitted() {
        let strict = AdapterManifest::synthesize(&entry(), &[], &SynthesisOptions::default());
        assert_eq!(strict, Err(GenerationError::EmptyToolSurface));

        let permissive = SynthesisOptions {
            allow_empty: true,
            ..SynthesisOptions::default()
        };
        let stub = AdapterManifest::synthesize(&entry(), &[], &permissive).expect("empty stub");
        assert!(stub.entry_points.is_empty());
    }

    #[test]
    fn duplicate_tool_names_are_reported() {
        let result = AdapterManifest::synthesize(
            &entry(),
            &[tool("add"), tool("add")],
            &SynthesisOptions::default(),
        );
        assert_eq!(result, Err(GenerationError::DuplicateToolName("add".to_owned())));
    }

    #[test]
    fn identifier_collisions_are_reported() {
        let result = AdapterManifest::synthesize(
            &entry(),
            &[tool("get-file"), tool("get_file")],
            &SynthesisOptions::default(),
        );
        assert!(matches!(
            result,
            Err(GenerationError::IdentifierCollision { ref identifier, .. }) if identifier == "get_file"
        ));
    }

    #[test]
    fn invalid_template_is_reported() {
        let options = SynthesisOptions {
            mock_template: "{{ unclosed".to_owned(),
            ..SynthesisOptions::default()
        };
        let result = AdapterManifest::synthesize(&entry(), &[tool("add")], &options);
        assert!(matches!(result, Err(GenerationError::Template(_))));
    }

    #[rstest]
    #[case("read_file", Some("read_file"))]
    #[case("getFileContents", Some("get_file_contents"))]
    #[case("microsoft_docs.search", Some("microsoft_docs_search"))]
    #[case("2fa-verify", Some("_2fa_verify"))]
    #[case("---", None)]
    fn identifiers_are_snake_case(#[case] name: &str, #[case] expected: Option<&str>) {
        assert_eq!(entry_point_identifier(name).as_deref(), expected);
    }
}
