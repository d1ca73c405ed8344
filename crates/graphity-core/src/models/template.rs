use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A text field a status update template requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateField {
    pub name: String,
}

/// A file slot a status update template requires, with the exact content
/// type uploads must declare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateFile {
    pub name: String,
    pub content_type: String,
}

/// Schema of one status update type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDefinition {
    pub identifier: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub fields: Vec<TemplateField>,
    #[serde(default)]
    pub files: Vec<TemplateFile>,
}

fn default_version() -> String {
    "1".to_string()
}

impl TemplateDefinition {
    pub fn new(identifier: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            version: version.into(),
            fields: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>) -> Self {
        self.fields.push(TemplateField { name: name.into() });
        self
    }

    pub fn with_file(mut self, name: impl Into<String>, content_type: impl Into<String>) -> Self {
        self.files.push(TemplateFile {
            name: name.into(),
            content_type: content_type.into(),
        });
        self
    }

    pub fn file_slot(&self, name: &str) -> Option<&TemplateFile> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Check the definition itself: a non-empty identifier and slot names
    /// that are unique across fields and files.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.identifier.trim().is_empty() {
            return Err(AppError::Configuration(
                "template identifier must not be empty".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        let names = self
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .chain(self.files.iter().map(|f| f.name.as_str()));
        for name in names {
            if !seen.insert(name) {
                return Err(AppError::Configuration(format!(
                    "template \"{}\" declares slot \"{}\" more than once",
                    self.identifier, name
                )));
            }
        }

        if let Some(file) = self.files.iter().find(|f| f.content_type.trim().is_empty()) {
            return Err(AppError::Configuration(format!(
                "template \"{}\" file slot \"{}\" has no content type",
                self.identifier, file.name
            )));
        }

        Ok(())
    }
}
