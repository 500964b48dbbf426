//! Principles and the principle registry.
//!
//! A principle pairs a critique request (what to check the response for) with
//! a revision request (how to rewrite it when the critique finds something).
//! Principles are grouped into an ordered [`PrincipleSet`], validated once at
//! startup and read-only afterwards.

pub mod library;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

lazy_static! {
    /// Principle names: lowercase identifiers usable on the command line.
    static ref NAME_PATTERN: Regex = Regex::new(r"^[a-z0-9][a-z0-9_-]*$").unwrap();
}

/// Errors that can occur when loading or validating principles.
#[derive(Error, Debug)]
pub enum PrincipleError {
    #[error("Failed to read principles file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Principle validation failed: {0}")]
    ValidationError(String),

    #[error("Unknown principle '{name}'. Available: {available}")]
    UnknownPrinciple { name: String, available: String },
}

/// A single constitutional principle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principle {
    /// Identifier (e.g., "harmful", "cite-sources")
    pub name: String,

    /// What the critique step should look for
    pub critique_request: String,

    /// How the revision step should rewrite the response
    pub revision_request: String,
}

impl Principle {
    /// Create a principle.
    pub fn new(
        name: impl Into<String>,
        critique_request: impl Into<String>,
        revision_request: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            critique_request: critique_request.into(),
            revision_request: revision_request.into(),
        }
    }

    fn validate(&self) -> Result<(), PrincipleError> {
        if !NAME_PATTERN.is_match(&self.name) {
            return Err(PrincipleError::ValidationError(format!(
                "Invalid principle name '{}': use lowercase letters, digits, '-' or '_'",
                self.name
            )));
        }

        if self.critique_request.trim().is_empty() {
            return Err(PrincipleError::ValidationError(format!(
                "Principle '{}' has an empty critique_request",
                self.name
            )));
        }

        if self.revision_request.trim().is_empty() {
            return Err(PrincipleError::ValidationError(format!(
                "Principle '{}' has an empty revision_request",
                self.name
            )));
        }

        Ok(())
    }
}

/// An ordered, validated collection of principles.
///
/// Order matters: the critique-revise loop applies principles left to right,
/// each one against the response produced by the previous.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "RawPrincipleSet")]
pub struct PrincipleSet {
    principles: Vec<Principle>,
}

/// Wire form of [`PrincipleSet`], validated on conversion.
#[derive(Deserialize)]
struct RawPrincipleSet {
    #[serde(default)]
    principles: Vec<Principle>,
}

impl TryFrom<RawPrincipleSet> for PrincipleSet {
    type Error = PrincipleError;

    fn try_from(raw: RawPrincipleSet) -> Result<Self, Self::Error> {
        Self::new(raw.principles)
    }
}

impl PrincipleSet {
    /// Build a set from principles, validating each one and name uniqueness.
    pub fn new(principles: Vec<Principle>) -> Result<Self, PrincipleError> {
        let set = Self { principles };
        set.validate()?;
        Ok(set)
    }

    /// An empty set. The pipeline then returns the initial response untouched.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The default selection from the built-in library.
    pub fn default_set() -> Self {
        Self {
            principles: library::DEFAULT_PRINCIPLES
                .iter()
                .filter_map(|name| library::get(name))
                .collect(),
        }
    }

    /// Select built-in principles by name, keeping the given order.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, PrincipleError> {
        let principles = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                library::get(name).ok_or_else(|| PrincipleError::UnknownPrinciple {
                    name: name.to_string(),
                    available: library::names().join(", "),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(principles)
    }

    /// Parse a set from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, PrincipleError> {
        let raw: RawPrincipleSet = serde_yaml::from_str(yaml)?;
        Self::try_from(raw)
    }

    /// Parse a set from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, PrincipleError> {
        let raw: RawPrincipleSet = serde_json::from_str(json)?;
        Self::try_from(raw)
    }

    /// Parse a set from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, PrincipleError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse a set from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PrincipleError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse a set from a file, choosing the format by extension.
    ///
    /// `.json` is read as JSON, anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PrincipleError> {
        let path = path.as_ref();
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let set = if is_json {
            Self::from_json_file(path)?
        } else {
            Self::from_yaml_file(path)?
        };

        tracing::debug!(path = %path.display(), count = set.len(), "Loaded principles");
        Ok(set)
    }

    fn validate(&self) -> Result<(), PrincipleError> {
        let mut seen = HashSet::new();

        for principle in &self.principles {
            principle.validate()?;

            if !seen.insert(principle.name.as_str()) {
                return Err(PrincipleError::ValidationError(format!(
                    "Duplicate principle name: {}",
                    principle.name
                )));
            }
        }

        Ok(())
    }

    /// Principles in application order.
    pub fn as_slice(&self) -> &[Principle] {
        &self.principles
    }

    /// Iterate principles in application order.
    pub fn iter(&self) -> std::slice::Iter<'_, Principle> {
        self.principles.iter()
    }

    /// Look up a principle by name.
    pub fn get(&self, name: &str) -> Option<&Principle> {
        self.principles.iter().find(|p| p.name == name)
    }

    /// Names in application order.
    pub fn names(&self) -> Vec<&str> {
        self.principles.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.principles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.principles.is_empty()
    }
}

impl<'a> IntoIterator for &'a PrincipleSet {
    type Item = &'a Principle;
    type IntoIter = std::slice::Iter<'a, Principle>;

    fn into_iter(self) -> Self::IntoIter {
        self.principles.iter()
    }
}
