//! Per-component error taxonomy (spec.md §7). Every variant here is a
//! per-file error: it is recorded as a [`crate::model::Report::PipelineError`]
//! and never aborts the pipeline. The only user-visible fatal surfaces are
//! [`crate::config::ConfigError`] (argument errors) and allocation failure,
//! which Rust surfaces as a process abort rather than a `Result`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("could not read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not read manifest {path}: {source}")]
    ReadManifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid regular expression: {0}")]
    InvalidRegex(#[from] regex::Error),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed PNG {path}: {source}")]
    MalformedPng {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("image has zero size after scaling")]
    ZeroSizedImage,
    #[error("compressing to format {format:?} failed: {reason}")]
    CompressionFailed {
        format: crate::config::Format,
        reason: String,
    },
    #[error("failed to re-encode PNG: {0}")]
    PngReencode(#[from] image::ImageError),
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("could not create parent directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not rename {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Aggregate error type for a single `FileTask`'s journey through the
/// pipeline, used only to build a human-readable
/// [`crate::model::Report::PipelineError`].
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Save(#[from] SaveError),
}
