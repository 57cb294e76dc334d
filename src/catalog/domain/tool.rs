//! Tool schema value object.

use super::CatalogDomainError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Description of one invocable tool exposed by a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSchema {
    name: String,
    #[serde(default)]
    description: String,
    input_schema: Value,
}

/// Shape of one declared tool parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Parameter name as declared in the schema.
    pub name: String,
    /// JSON type name, or `any` when the schema leaves it open.
    pub kind: String,
    /// Whether the schema lists the parameter as required.
    pub required: bool,
    /// Optional parameter description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ToolSchema {
    /// Creates a tool schema.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogDomainError::EmptyToolName`] when the name is empty or
    /// [`CatalogDomainError::NonObjectInputSchema`] when the input schema is
    /// not a JSON object.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Result<Self, CatalogDomainError> {
        let normalized_name = name.into().trim().to_owned();
        if normalized_name.is_empty() {
            return Err(CatalogDomainError::EmptyToolName);
        }
        if !input_schema.is_object() {
            return Err(CatalogDomainError::NonObjectInputSchema(normalized_name));
        }

        Ok(Self {
            name: normalized_name,
            description: description.into().trim().to_owned(),
            input_schema,
        })
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the tool description, possibly empty.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the JSON Schema for the tool input.
    #[must_use]
    pub const fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    /// Returns the parameter shape declared by `properties` and `required`.
    ///
    /// Parameters are returned in the key order of the schema's `properties`
    /// map. A schema without `properties` declares no parameters.
    ///
    /// # Errors
    ///
    /// Returns a diagnostic string when `properties` is present but is not an
    /// object.
    pub fn parameters(&self) -> Result<Vec<ParameterSpec>, String> {
        let Some(properties) = self.input_schema.get("properties") else {
            return Ok(Vec::new());
        };
        let properties = properties
            .as_object()
            .ok_or_else(|| "'properties' must be a JSON object".to_owned())?;

        let required: Vec<&str> = self
            .input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        Ok(properties
            .iter()
            .map(|(name, property)| ParameterSpec {
                name: name.clone(),
                kind: property
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("any")
                    .to_owned(),
                required: required.contains(&name.as_str()),
                description: property
                    .get("description")
                    .and_then(Value::as_str)
                    .map(str::to_owned),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parameters_follow_properties_and_required() {
        let tool = ToolSchema::new(
            "add",
            "Add two numbers",
            json!({
                "type": "object",
                "properties": {
                    "a": {"type": "number", "description": "first"},
                    "b": {"type": "number"},
                    "label": {}
                },
                "required": ["a", "b"]
            }),
        )
        .expect("valid tool");

        let parameters = tool.parameters().expect("well-formed properties");
        let summary: Vec<(&str, &str, bool)> = parameters
            .iter()
            .map(|spec| (spec.name.as_str(), spec.kind.as_str(), spec.required))
            .collect();
        assert_eq!(
            summary,
            vec![("a", "number", true), ("b", "number", true), ("label", "any", false)]
        );
    }

    #[test]
    fn parameters_keep_declaration_order() {
        let tool = ToolSchema::new(
            "lookup",
            "",
            json!({
                "type": "object",
                "properties": {"zeta": {}, "alpha": {}, "kappa": {}}
            }),
        )
        .expect("valid tool");

        let names: Vec<String> = tool
            .parameters()
            .expect("well-formed properties")
            .into_iter()
            .map(|spec| spec.name)
            .collect();
        assert_eq!(names, vec!["zeta", "alpha", "kappa"]);
    }

    #[test]
    fn non_object_properties_are_reported() {
        let tool = ToolSchema::new("broken", "", json!({"properties": []})).expect("valid tool");
        assert!(tool.parameters().is_err());
    }

    #[test]
    fn non_object_schema_is_rejected() {
        let result = ToolSchema::new("broken", "", json!("string"));
        assert_eq!(
            result,
            Err(CatalogDomainError::NonObjectInputSchema("broken".to_owned()))
        );
    }
}
