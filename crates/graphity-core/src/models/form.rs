use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::AppError;

/// An uploaded file of a create request.
///
/// The bytes live in a transient temp file until the stager promotes them to
/// a permanent location; the temp file is removed when the `FormFile` drops.
#[derive(Debug)]
pub struct FormFile {
    original_filename: String,
    content_type: String,
    transient: NamedTempFile,
    size_bytes: u64,
    persisted_path: Option<PathBuf>,
}

impl FormFile {
    pub fn new(
        original_filename: impl Into<String>,
        content_type: impl Into<String>,
        transient: NamedTempFile,
        size_bytes: u64,
    ) -> Self {
        Self {
            original_filename: original_filename.into(),
            content_type: content_type.into(),
            transient,
            size_bytes,
            persisted_path: None,
        }
    }

    pub fn original_filename(&self) -> &str {
        &self.original_filename
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Location of the uploaded bytes before staging.
    pub fn transient_path(&self) -> &Path {
        self.transient.path()
    }

    /// Final location, set once the file has been staged.
    pub fn persisted_path(&self) -> Option<&Path> {
        self.persisted_path.as_deref()
    }

    pub fn set_persisted_path(&mut self, path: PathBuf) {
        self.persisted_path = Some(path);
    }

    pub fn clear_persisted_path(&mut self) -> Option<PathBuf> {
        self.persisted_path.take()
    }
}

#[derive(Debug)]
pub enum FormItem {
    Field(String),
    File(FormFile),
}

/// Text fields and uploaded files of a single create request, keyed by
/// form identifier. An identifier is registered at most once, as either a
/// field or a file.
#[derive(Debug, Default)]
pub struct FormItemSet {
    items: BTreeMap<String, FormItem>,
}

impl FormItemSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_field(
        &mut self,
        identifier: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), AppError> {
        self.insert(identifier.into(), FormItem::Field(value.into()))
    }

    pub fn add_file(&mut self, identifier: impl Into<String>, file: FormFile) -> Result<(), AppError> {
        self.insert(identifier.into(), FormItem::File(file))
    }

    fn insert(&mut self, identifier: String, item: FormItem) -> Result<(), AppError> {
        if self.items.contains_key(&identifier) {
            return Err(AppError::DuplicateIdentifier(identifier));
        }
        self.items.insert(identifier, item);
        Ok(())
    }

    pub fn field(&self, identifier: &str) -> Option<&str> {
        match self.items.get(identifier) {
            Some(FormItem::Field(value)) => Some(value),
            _ => None,
        }
    }

    pub fn file(&self, identifier: &str) -> Option<&FormFile> {
        match self.items.get(identifier) {
            Some(FormItem::File(file)) => Some(file),
            _ => None,
        }
    }

    pub fn file_mut(&mut self, identifier: &str) -> Option<&mut FormFile> {
        match self.items.get_mut(identifier) {
            Some(FormItem::File(file)) => Some(file),
            _ => None,
        }
    }

    pub fn field_identifiers(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|(id, item)| match item {
            FormItem::Field(_) => Some(id.as_str()),
            FormItem::File(_) => None,
        })
    }

    pub fn file_identifiers(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|(id, item)| match item {
            FormItem::File(_) => Some(id.as_str()),
            FormItem::Field(_) => None,
        })
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.items.contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
