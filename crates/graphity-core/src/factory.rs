//! Builds [`StatusUpdate`] payloads from validated form items.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use crate::error::AppError;
use crate::models::{FormItemSet, StatusUpdate, TemplateDefinition};
use crate::templates::TemplateRegistry;

#[derive(Debug, Clone)]
pub struct StatusUpdateFactory {
    registry: TemplateRegistry,
}

impl StatusUpdateFactory {
    pub fn new(registry: TemplateRegistry) -> Self {
        Self { registry }
    }

    /// Instantiate a status update of type `type_name` from `items`.
    ///
    /// File slots must already be staged: a file without a persisted path
    /// counts as missing.
    pub fn instantiate(
        &self,
        type_name: &str,
        items: &FormItemSet,
        timestamp: DateTime<Utc>,
    ) -> Result<StatusUpdate, AppError> {
        let template = self.registry.lookup(type_name)?;
        build(&template, items, timestamp)
    }
}

fn build(
    template: &TemplateDefinition,
    items: &FormItemSet,
    timestamp: DateTime<Utc>,
) -> Result<StatusUpdate, AppError> {
    let mut content = Map::new();
    let mut files = BTreeMap::new();

    for field in &template.fields {
        let value = items.field(&field.name).ok_or_else(|| {
            AppError::InstantiationFailed(format!("field \"{}\" is missing", field.name))
        })?;
        content.insert(field.name.clone(), Value::String(value.to_string()));
    }

    for slot in &template.files {
        let file = items.file(&slot.name).ok_or_else(|| {
            AppError::InstantiationFailed(format!("file \"{}\" is missing", slot.name))
        })?;
        let path = file.persisted_path().ok_or_else(|| {
            AppError::InstantiationFailed(format!("file \"{}\" has not been stored", slot.name))
        })?;
        content.insert(
            slot.name.clone(),
            json!({
                "path": path.display().to_string(),
                "content_type": file.content_type(),
                "original_filename": file.original_filename(),
            }),
        );
        files.insert(slot.name.clone(), path.to_path_buf());
    }

    let ignored: Vec<&str> = items
        .field_identifiers()
        .chain(items.file_identifiers())
        .filter(|id| !content.contains_key(*id))
        .collect();
    if !ignored.is_empty() {
        tracing::debug!(
            template = %template.identifier,
            ignored = ?ignored,
            "Form items not declared by template"
        );
    }

    Ok(StatusUpdate {
        content_type: template.identifier.clone(),
        template_version: template.version.clone(),
        timestamp,
        content: Value::Object(content),
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FormFile;
    use std::path::PathBuf;

    fn factory() -> StatusUpdateFactory {
        let registry = TemplateRegistry::from_templates([
            TemplateDefinition::new("Plain", "1").with_field("message"),
            TemplateDefinition::new("Photo", "3")
                .with_field("title")
                .with_file("picture", "image/png"),
        ])
        .unwrap();
        StatusUpdateFactory::new(registry)
    }

    #[test]
    fn builds_plain_status_update() {
        let mut items = FormItemSet::new();
        items.add_field("message", "hello graph").unwrap();
        items.add_field("user_id", "7").unwrap();

        let now = Utc::now();
        let update = factory().instantiate("Plain", &items, now).unwrap();
        assert_eq!(update.content_type, "Plain");
        assert_eq!(update.timestamp, now);
        assert_eq!(update.content, json!({"message": "hello graph"}));
        assert!(update.files.is_empty());
    }

    #[test]
    fn missing_field_fails_instantiation() {
        let items = FormItemSet::new();
        let err = factory().instantiate("Plain", &items, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InstantiationFailed(msg) if msg.contains("message")));
    }

    #[test]
    fn unstaged_file_fails_instantiation() {
        let mut items = FormItemSet::new();
        items.add_field("title", "sunset").unwrap();
        let transient = tempfile::NamedTempFile::new().unwrap();
        items
            .add_file("picture", FormFile::new("sunset.png", "image/png", transient, 0))
            .unwrap();

        let err = factory().instantiate("Photo", &items, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InstantiationFailed(msg) if msg.contains("picture")));
    }

    #[test]
    fn staged_file_is_referenced() {
        let mut items = FormItemSet::new();
        items.add_field("title", "sunset").unwrap();
        let transient = tempfile::NamedTempFile::new().unwrap();
        items
            .add_file("picture", FormFile::new("sunset.png", "image/png", transient, 0))
            .unwrap();
        let staged = PathBuf::from("/var/graphity/pictures/1-abc-sunset.png");
        items
            .file_mut("picture")
            .unwrap()
            .set_persisted_path(staged.clone());

        let update = factory().instantiate("Photo", &items, Utc::now()).unwrap();
        assert_eq!(update.template_version, "3");
        assert_eq!(update.files.get("picture"), Some(&staged));
        assert_eq!(update.content["picture"]["content_type"], "image/png");
        assert_eq!(update.content["title"], "sunset");
    }

    #[test]
    fn unknown_type_is_reported() {
        let err = factory()
            .instantiate("Video", &FormItemSet::new(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownTemplateType(_)));
    }
}
