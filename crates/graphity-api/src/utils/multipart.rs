//! Multipart decoding into a [`FormItemSet`].
//!
//! File parts are streamed into transient temp files as they arrive, so the
//! bytes are on disk before any business validation runs.

use std::path::Path;

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use graphity_core::models::{FormFile, FormItemSet};
use graphity_core::AppError;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const MALFORMED_MESSAGE: &str = "an error encountered while processing the request!";

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::PayloadTooLarge(err.body_text());
    }
    tracing::debug!(error = %err.body_text(), "Failed to decode multipart body");
    AppError::MalformedUpload(MALFORMED_MESSAGE.to_string())
}

/// Decode every part of `multipart`.
///
/// A part carrying a filename becomes a file, any other part a text field.
/// Reusing an identifier fails with `DuplicateIdentifier`.
pub async fn extract_form_items(
    mut multipart: Multipart,
    temp_dir: &Path,
    max_bytes: usize,
) -> Result<FormItemSet, AppError> {
    let mut items = FormItemSet::new();
    let mut total_bytes: u64 = 0;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let identifier = field
            .name()
            .map(str::to_string)
            .ok_or_else(|| AppError::MalformedUpload(MALFORMED_MESSAGE.to_string()))?;

        if field.file_name().is_some() {
            let file = stream_to_temp_file(field, temp_dir, max_bytes, &mut total_bytes).await?;
            items.add_file(identifier, file)?;
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            total_bytes += value.len() as u64;
            if total_bytes > max_bytes as u64 {
                return Err(too_large(max_bytes));
            }
            items.add_field(identifier, value)?;
        }
    }

    tracing::debug!(
        items = items.len(),
        size_bytes = total_bytes,
        "Multipart form decoded"
    );

    Ok(items)
}

fn too_large(max_bytes: usize) -> AppError {
    AppError::PayloadTooLarge(format!(
        "request exceeds maximum allowed size of {} MB",
        max_bytes / 1024 / 1024
    ))
}

async fn stream_to_temp_file(
    mut field: Field<'_>,
    temp_dir: &Path,
    max_bytes: usize,
    total_bytes: &mut u64,
) -> Result<FormFile, AppError> {
    let original_filename = field.file_name().unwrap_or_default().to_string();
    let content_type = field
        .content_type()
        .map(|ct| ct.trim().to_string())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    let transient = NamedTempFile::new_in(temp_dir).map_err(|e| {
        AppError::persistence(
            format!("failed to create temp file in {}", temp_dir.display()),
            e,
        )
    })?;
    let mut writer = tokio::fs::File::from_std(
        transient
            .as_file()
            .try_clone()
            .map_err(|e| AppError::persistence("failed to open temp file", e))?,
    );

    let mut size_bytes: u64 = 0;
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        size_bytes += chunk.len() as u64;
        *total_bytes += chunk.len() as u64;
        if *total_bytes > max_bytes as u64 {
            return Err(too_large(max_bytes));
        }
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| AppError::persistence("failed to write temp file", e))?;
    }
    writer
        .flush()
        .await
        .map_err(|e| AppError::persistence("failed to write temp file", e))?;

    Ok(FormFile::new(
        original_filename,
        content_type,
        transient,
        size_bytes,
    ))
}
