//! Loadable adapter built from a generated manifest.
//!
//! An [`AdapterModule`] exposes one callable entry point per discovered
//! tool. Invocations are checked against the recorded parameter shape, then
//! either answered from the mock template or turned into a planned remote
//! call for the orchestrator to execute.

use super::artifacts::MANIFEST_FILE;
use crate::catalog::domain::{AdapterManifest, AdapterMode, EntryPoint};
use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use minijinja::Environment;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised when loading or invoking an adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdapterInvocationError {
    /// The manifest could not be read or decoded.
    #[error("cannot load adapter manifest: {0}")]
    Load(String),

    /// No entry point has this name.
    #[error("adapter for '{server}' has no tool '{tool}'")]
    UnknownTool {
        /// Server name.
        server: String,
        /// Requested tool.
        tool: String,
    },

    /// Arguments were not a JSON object.
    #[error("arguments for '{0}' must be a JSON object")]
    ArgumentsNotObject(String),

    /// A required parameter was not supplied.
    #[error("tool '{tool}' requires parameter '{parameter}'")]
    MissingParameter {
        /// Tool name.
        tool: String,
        /// Parameter name.
        parameter: String,
    },

    /// A supplied parameter is not declared by the tool.
    #[error("tool '{tool}' does not declare parameter '{parameter}'")]
    UndeclaredParameter {
        /// Tool name.
        tool: String,
        /// Parameter name.
        parameter: String,
    },

    /// The mock template failed to render.
    #[error("mock response for '{tool}' failed to render: {reason}")]
    Render {
        /// Tool name.
        tool: String,
        /// Diagnostic.
        reason: String,
    },

    /// A client-mode adapter has no server location to call.
    #[error("adapter for '{0}' has no server location")]
    NoLocation(String),
}

/// Remote call an orchestrator should perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCall {
    /// Server location.
    pub location: String,
    /// Exact tool name.
    pub tool: String,
    /// Validated arguments.
    pub arguments: Map<String, Value>,
}

/// Result of invoking an entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Locally rendered mock response.
    Mock(String),
    /// Call to forward to the server.
    Planned(PlannedCall),
}

/// Adapter ready to be invoked.
#[derive(Debug, Clone)]
pub struct AdapterModule {
    manifest: AdapterManifest,
}

impl AdapterModule {
    /// Wraps an in-memory manifest.
    #[must_use]
    pub const fn from_manifest(manifest: AdapterManifest) -> Self {
        Self { manifest }
    }

    /// Loads the manifest stored in `adapter_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterInvocationError::Load`] when the manifest cannot be
    /// read or decoded.
    pub fn load(adapter_dir: &Utf8Path) -> Result<Self, AdapterInvocationError> {
        let load_error = |err: &dyn std::fmt::Display| {
            AdapterInvocationError::Load(format!("{adapter_dir}: {err}"))
        };
        let dir = Dir::open_ambient_dir(adapter_dir, ambient_authority())
            .map_err(|err| load_error(&err))?;
        let document = dir
            .read_to_string(MANIFEST_FILE)
            .map_err(|err| load_error(&err))?;
        let manifest = serde_json::from_str(&document).map_err(|err| load_error(&err))?;
        Ok(Self { manifest })
    }

    /// Returns the underlying manifest.
    #[must_use]
    pub const fn manifest(&self) -> &AdapterManifest {
        &self.manifest
    }

    /// Returns the callable entry points.
    #[must_use]
    pub fn entry_points(&self) -> &[EntryPoint] {
        &self.manifest.entry_points
    }

    /// Invokes the entry point for `tool` with `arguments`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterInvocationError`] for unknown tools, arguments that
    /// do not match the declared parameters, template failures, or a
    /// client-mode adapter without a location.
    pub fn invoke(
        &self,
        tool: &str,
        arguments: &Value,
    ) -> Result<Invocation, AdapterInvocationError> {
        let entry_point =
            self.manifest
                .entry_point(tool)
                .ok_or_else(|| AdapterInvocationError::UnknownTool {
                    server: self.manifest.server.clone(),
                    tool: tool.to_owned(),
                })?;
        let arguments = validate_arguments(entry_point, arguments)?;

        match self.manifest.mode {
            AdapterMode::Mock => self.render_mock(entry_point, &arguments).map(Invocation::Mock),
            AdapterMode::Client => {
                let location = self
                    .manifest
                    .location
                    .clone()
                    .ok_or_else(|| AdapterInvocationError::NoLocation(self.manifest.server.clone()))?;
                Ok(Invocation::Planned(PlannedCall {
                    location,
                    tool: entry_point.name.clone(),
                    arguments,
                }))
            }
        }
    }

    fn render_mock(
        &self,
        entry_point: &EntryPoint,
        arguments: &Map<String, Value>,
    ) -> Result<String, AdapterInvocationError> {
        let mut context = arguments.clone();
        context.insert("tool".to_owned(), Value::String(entry_point.name.clone()));
        context.insert(
            "server".to_owned(),
            Value::String(self.manifest.server.clone()),
        );
        Environment::new()
            .render_str(&entry_point.mock_response, context)
            .map_err(|error| AdapterInvocationError::Render {
                tool: entry_point.name.clone(),
                reason: error.to_string(),
            })
    }
}

fn validate_arguments(
    entry_point: &EntryPoint,
    arguments: &Value,
) -> Result<Map<String, Value>, AdapterInvocationError> {
    let supplied = arguments
        .as_object()
        .ok_or_else(|| AdapterInvocationError::ArgumentsNotObject(entry_point.name.clone()))?;

    if let Some(missing) = entry_point
        .parameters
        .iter()
        .find(|parameter| parameter.required && !supplied.contains_key(&parameter.name))
    {
        return Err(AdapterInvocationError::MissingParameter {
            tool: entry_point.name.clone(),
            parameter: missing.name.clone(),
        });
    }

    if let Some(undeclared) = supplied.keys().find(|key| {
        !entry_point
            .parameters
            .iter()
            .any(|parameter| &parameter.name == *key)
    }) {
        return Err(AdapterInvocationError::UndeclaredParameter {
            tool: entry_point.name.clone(),
            parameter: undeclared.clone(),
        });
    }

    Ok(supplied.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::domain::{ServerEntry, ServerName, SynthesisOptions, ToolSchema};
    use rstest::{fixture, rstest};
    use serde_json::json;

    fn manifest(mode: AdapterMode, location: Option<&str>) -> AdapterManifest {
        let entry = ServerEntry::new(
            ServerName::new("Calculator").expect("valid server name"),
            location.map(str::to_owned),
        );
        let tools = vec![
            ToolSchema::new(
                "add",
                "Add two numbers",
                json!({
                    "type": "object",
                    "properties": {"a": {"type": "number"}, "b": {"type": "number"}},
                    "required": ["a", "b"]
                }),
            )
            .expect("valid tool"),
        ];
        let options = SynthesisOptions {
            mode,
            mock_template: "{{ server }}.{{ tool }}({{ a }}, {{ b }})".to_owned(),
            allow_empty: false,
        };
        AdapterManifest::synthesize(&entry, &tools, &options).expect("synthesis")
    }

    #[fixture]
    fn mock_module() -> AdapterModule {
        AdapterModule::from_manifest(manifest(AdapterMode::Mock, None))
    }

    #[rstest]
    fn mock_mode_renders_template(mock_module: AdapterModule) {
        let outcome = mock_module
            .invoke("add", &json!({"a": 2, "b": 3}))
            .expect("invocation succeeds");
        assert_eq!(outcome, Invocation::Mock("Calculator.add(2, 3)".to_owned()));
    }

    #[rstest]
    #[case("subtract", json!({"a": 1, "b": 2}))]
    #[case("add", json!([1, 2]))]
    #[case("add", json!({"a": 1}))]
    #[case("add", json!({"a": 1, "b": 2, "c": 3}))]
    fn invalid_invocations_are_rejected(
        mock_module: AdapterModule,
        #[case] tool: &str,
        #[case] arguments: Value,
    ) {
        assert!(mock_module.invoke(tool, &arguments).is_err());
    }

    #[rstest]
    fn missing_parameter_is_named(mock_module: AdapterModule) {
        let error = mock_module
            .invoke("add", &json!({"b": 1}))
            .expect_err("missing parameter rejected");
        assert_eq!(
            error,
            AdapterInvocationError::MissingParameter {
                tool: "add".to_owned(),
                parameter: "a".to_owned(),
            }
        );
    }

    #[test]
    fn client_mode_plans_remote_call() {
        let module = AdapterModule::from_manifest(manifest(
            AdapterMode::Client,
            Some("https://calc.example.com/mcp"),
        ));

        let outcome = module
            .invoke("add", &json!({"a": 1, "b": 2}))
            .expect("invocation succeeds");

        let Invocation::Planned(call) = outcome else {
            panic!("expected a planned call");
        };
        assert_eq!(call.location, "https://calc.example.com/mcp");
        assert_eq!(call.tool, "add");
        assert_eq!(call.arguments.get("a"), Some(&json!(1)));
    }

    #[test]
    fn client_mode_without_location_fails() {
        let module = AdapterModule::from_manifest(manifest(AdapterMode::Client, None));
        let error = module
            .invoke("add", &json!({"a": 1, "b": 2}))
            .expect_err("no location");
        assert_eq!(
            error,
            AdapterInvocationError::NoLocation("Calculator".to_owned())
        );
    }
}
