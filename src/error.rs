//! Error handling for notice extraction and batch processing.
//!
//! `ExtractionError` is the per-document failure value produced by sniffing and
//! parsing. It is returned, never thrown across documents. `NoticeError` covers
//! the batch layer: file system, configuration and serialization failures.

use crate::models::{Entity, NoticeFormat};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Why a single document could not be turned into a normalized record tree
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionError {
    #[error("Format not recognized for '{filename}'")]
    FormatNotRecognized { filename: String },

    #[error("{format}: required field {entity}.{field} missing")]
    RequiredFieldMissing {
        format: NoticeFormat,
        entity: Entity,
        field: &'static str,
    },

    #[error("{format}: malformed {entity}.{field} value '{raw_value}' - {reason}")]
    MalformedValue {
        format: NoticeFormat,
        entity: Entity,
        field: &'static str,
        raw_value: String,
        reason: String,
    },

    #[error("Structural corruption in '{filename}': {reason}")]
    StructuralCorruption {
        filename: String,
        format: Option<NoticeFormat>,
        reason: String,
    },
}

impl ExtractionError {
    pub fn missing(format: NoticeFormat, entity: Entity, field: &'static str) -> Self {
        Self::RequiredFieldMissing {
            format,
            entity,
            field,
        }
    }

    pub fn malformed(
        format: NoticeFormat,
        entity: Entity,
        field: &'static str,
        raw_value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedValue {
            format,
            entity,
            field,
            raw_value: raw_value.into(),
            reason: reason.into(),
        }
    }

    pub fn corrupt(
        filename: impl Into<String>,
        format: Option<NoticeFormat>,
        reason: impl Into<String>,
    ) -> Self {
        Self::StructuralCorruption {
            filename: filename.into(),
            format,
            reason: reason.into(),
        }
    }

    /// Stable label for statistics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FormatNotRecognized { .. } => "format_not_recognized",
            Self::RequiredFieldMissing { .. } => "required_field_missing",
            Self::MalformedValue { .. } => "malformed_value",
            Self::StructuralCorruption { .. } => "structural_corruption",
        }
    }

    /// `entity.field` that caused the failure, when one field is to blame
    pub fn offending_field(&self) -> Option<String> {
        match self {
            Self::RequiredFieldMissing { entity, field, .. }
            | Self::MalformedValue { entity, field, .. } => Some(format!("{entity}.{field}")),
            _ => None,
        }
    }

    /// Literal source text that could not be interpreted
    pub fn offending_raw_value(&self) -> Option<&str> {
        match self {
            Self::MalformedValue { raw_value, .. } => Some(raw_value),
            _ => None,
        }
    }

    pub fn format(&self) -> Option<NoticeFormat> {
        match self {
            Self::FormatNotRecognized { .. } => None,
            Self::RequiredFieldMissing { format, .. } | Self::MalformedValue { format, .. } => {
                Some(*format)
            }
            Self::StructuralCorruption { format, .. } => *format,
        }
    }
}

/// Batch-level errors
#[derive(Error, Debug)]
pub enum NoticeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input not found at path: {path}")]
    InputNotFound { path: PathBuf },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Processing failed for file: {path} - {reason}")]
    ProcessingFailed { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, NoticeError>;
