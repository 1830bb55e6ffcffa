//! Common types used throughout hydra-connect
//!
//! This module contains shared type definitions, type aliases,
//! and the request bodies accepted by project and jobset mutations.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

// ============================================================================
// HTTP Types
// ============================================================================

/// HTTP method used by the connector's primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    GET,
    POST,
    PUT,
    DELETE,
}

impl Method {
    /// Upper-case verb as sent on the wire
    pub fn as_str(self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => reqwest::Method::GET,
            Method::POST => reqwest::Method::POST,
            Method::PUT => reqwest::Method::PUT,
            Method::DELETE => reqwest::Method::DELETE,
        }
    }
}

// ============================================================================
// Project Settings
// ============================================================================

/// Properties sent when creating or updating a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSettings {
    /// Human-readable name
    pub displayname: String,

    /// Free-form description
    #[serde(default)]
    pub description: String,

    /// Project homepage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,

    /// Whether the project shows up in the overview
    #[serde(default = "default_true", with = "flag")]
    pub visible: bool,

    /// Whether the project's jobsets get evaluated
    #[serde(default = "default_true", with = "flag")]
    pub enabled: bool,
}

impl ProjectSettings {
    /// Create visible, enabled project settings
    pub fn new(displayname: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            displayname: displayname.into(),
            description: description.into(),
            homepage: None,
            visible: true,
            enabled: true,
        }
    }

    /// Set the homepage
    #[must_use]
    pub fn homepage(mut self, homepage: impl Into<String>) -> Self {
        self.homepage = Some(homepage.into());
        self
    }

    /// Set visibility
    #[must_use]
    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Set whether the project is enabled
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

// ============================================================================
// Jobset Settings
// ============================================================================

/// A single jobset input, e.g. a Git repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobsetInput {
    /// Input type (`git`, `string`, `boolean`, `nix`, ...)
    #[serde(rename = "type")]
    pub input_type: String,

    /// Input value, e.g. a repository URL
    pub value: String,

    /// Notify the committers of this input on failures
    #[serde(default, with = "flag")]
    pub emailresponsible: bool,
}

impl JobsetInput {
    pub fn new(input_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            input_type: input_type.into(),
            value: value.into(),
            emailresponsible: false,
        }
    }
}

/// Properties sent when creating or updating a jobset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobsetSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Name of the input containing the Nix expression
    pub nixexprinput: String,

    /// Path of the Nix expression inside that input
    pub nixexprpath: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emailoverride: Option<String>,

    #[serde(default = "default_true", with = "flag")]
    pub enabled: bool,

    #[serde(default = "default_true", with = "flag")]
    pub visible: bool,

    /// Number of evaluations to keep
    #[serde(default = "default_keepnr")]
    pub keepnr: u32,

    /// Seconds between evaluations (0 disables polling)
    #[serde(default = "default_checkinterval")]
    pub checkinterval: u32,

    #[serde(default = "default_schedulingshares")]
    pub schedulingshares: u32,

    #[serde(default)]
    pub inputs: BTreeMap<String, JobsetInput>,
}

impl JobsetSettings {
    /// Create jobset settings evaluating `nixexprpath` from input `nixexprinput`
    pub fn new(nixexprinput: impl Into<String>, nixexprpath: impl Into<String>) -> Self {
        Self {
            description: None,
            nixexprinput: nixexprinput.into(),
            nixexprpath: nixexprpath.into(),
            emailoverride: None,
            enabled: true,
            visible: true,
            keepnr: default_keepnr(),
            checkinterval: default_checkinterval(),
            schedulingshares: default_schedulingshares(),
            inputs: BTreeMap::new(),
        }
    }

    /// Add an input
    #[must_use]
    pub fn input(mut self, name: impl Into<String>, input: JobsetInput) -> Self {
        self.inputs.insert(name.into(), input);
        self
    }

    /// Set the description
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

fn default_true() -> bool {
    true
}

fn default_keepnr() -> u32 {
    3
}

fn default_checkinterval() -> u32 {
    300
}

fn default_schedulingshares() -> u32 {
    100
}

/// Hydra exchanges flags as `0`/`1`; accept JSON booleans as well.
mod flag {
    use super::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Flag {
            Bool(bool),
            Int(i64),
            Str(String),
        }

        Ok(match Flag::deserialize(deserializer)? {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
            Flag::Str(s) => !matches!(s.as_str(), "" | "0" | "false"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_method_display() {
        assert_eq!(Method::GET.to_string(), "GET");
        assert_eq!(Method::DELETE.to_string(), "DELETE");
        assert_eq!(reqwest::Method::from(Method::PUT), reqwest::Method::PUT);
    }

    #[test]
    fn test_project_settings_serialize_flags_as_ints() {
        let settings = ProjectSettings::new("Foobar", "Test project");
        let value = serde_json::to_value(&settings).unwrap();

        assert_eq!(
            value,
            json!({
                "displayname": "Foobar",
                "description": "Test project",
                "visible": 1,
                "enabled": 1
            })
        );
    }

    #[test]
    fn test_project_settings_accepts_bool_and_int_flags() {
        let settings: ProjectSettings = serde_json::from_value(json!({
            "displayname": "Foobar",
            "visible": false,
            "enabled": 1
        }))
        .unwrap();

        assert!(!settings.visible);
        assert!(settings.enabled);
        assert_eq!(settings.description, "");
    }

    #[test]
    fn test_jobset_settings_defaults() {
        let settings: JobsetSettings = serde_json::from_value(json!({
            "nixexprinput": "src",
            "nixexprpath": "release.nix",
            "inputs": {
                "src": {"type": "git", "value": "https://github.com/example/repo"}
            }
        }))
        .unwrap();

        assert!(settings.enabled);
        assert_eq!(settings.keepnr, 3);
        assert_eq!(settings.checkinterval, 300);
        assert_eq!(settings.schedulingshares, 100);
        assert_eq!(settings.inputs["src"].input_type, "git");
        assert!(!settings.inputs["src"].emailresponsible);
    }

    #[test]
    fn test_jobset_settings_builder() {
        let settings = JobsetSettings::new("src", "release.nix")
            .description("Trunk")
            .input("src", JobsetInput::new("git", "https://example.com/repo.git"));

        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(value["description"], "Trunk");
        assert_eq!(value["inputs"]["src"]["type"], "git");
        assert_eq!(value["inputs"]["src"]["emailresponsible"], 0);
        assert!(value.get("emailoverride").is_none());
    }
}
