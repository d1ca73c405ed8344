//! Registry of status update templates.
//!
//! Populated once at startup and read-only afterwards, so lookups need no
//! locking and the registry is cheap to clone into every request task.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::AppError;
use crate::models::TemplateDefinition;

/// Name of the template plain text status updates use.
pub const PLAIN_TEMPLATE: &str = "Plain";

#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: Arc<HashMap<String, Arc<TemplateDefinition>>>,
}

impl TemplateRegistry {
    /// Build a registry from `templates`. Every definition is validated and
    /// identifiers must be unique.
    pub fn from_templates(
        templates: impl IntoIterator<Item = TemplateDefinition>,
    ) -> Result<Self, AppError> {
        let mut map = HashMap::new();
        for template in templates {
            template.validate()?;
            let identifier = template.identifier.clone();
            if map.insert(identifier.clone(), Arc::new(template)).is_some() {
                return Err(AppError::Configuration(format!(
                    "status update template \"{}\" is defined more than once",
                    identifier
                )));
            }
        }
        Ok(Self {
            templates: Arc::new(map),
        })
    }

    /// Registry holding only the built-in templates.
    pub fn builtin() -> Self {
        Self::from_templates([plain_template()]).unwrap_or_default()
    }

    /// Load templates from a JSON array at `path`. The built-in `Plain`
    /// template is added unless the file defines its own.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Configuration(format!(
                "failed to read templates file {}: {}",
                path.display(),
                e
            ))
        })?;
        let mut templates: Vec<TemplateDefinition> = serde_json::from_str(&raw)?;

        if !templates.iter().any(|t| t.identifier == PLAIN_TEMPLATE) {
            templates.push(plain_template());
        }

        let registry = Self::from_templates(templates)?;
        tracing::info!(
            path = %path.display(),
            templates = registry.len(),
            "Status update templates loaded"
        );
        Ok(registry)
    }

    pub fn lookup(&self, type_name: &str) -> Result<Arc<TemplateDefinition>, AppError> {
        self.templates
            .get(type_name)
            .cloned()
            .ok_or_else(|| AppError::UnknownTemplateType(type_name.to_string()))
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.templates.contains_key(type_name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn plain_template() -> TemplateDefinition {
    TemplateDefinition::new(PLAIN_TEMPLATE, "1").with_field("message")
}
