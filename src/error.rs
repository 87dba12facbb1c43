//! Error types for scene building and texture loading.
//!
//! A failed [`BuildError`] aborts the whole build. A [`TextureLoadError`] is
//! local to one material channel: the resolver logs it and leaves the channel
//! empty. [`MaterialError`] is the only material failure that propagates.

use std::path::PathBuf;

use thiserror::Error;

use crate::data_structures::material::MaterialChannel;

/// Failure reported by a [`crate::gpu::Backend`] when it refuses to create a resource.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    #[error("invalid mesh data for {label}: {reason}")]
    InvalidMesh { label: String, reason: String },
    #[error("invalid texture data for {label}: {reason}")]
    InvalidTexture { label: String, reason: String },
}

/// Why a single texture could not be turned into a GPU texture.
#[derive(Error, Debug)]
pub enum TextureLoadError {
    #[error("texture file {path} does not exist")]
    NotFound { path: PathBuf },
    #[error("failed to read texture file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode texture {label}")]
    Decode {
        label: String,
        #[source]
        source: image::ImageError,
    },
    #[error("texture {label} has {channels} channels, only 3 or 4 are supported")]
    UnsupportedChannelCount { label: String, channels: u8 },
    #[error("texture source {0} is not supported")]
    UnsupportedSource(String),
    #[error(transparent)]
    Gpu(#[from] GpuError),
}

/// A material that cannot be resolved at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MaterialError {
    #[error("material {material:?} lists {count} textures for the {channel} channel, at most one is supported")]
    UnsupportedLayout {
        material: String,
        channel: MaterialChannel,
        count: usize,
    },
}

/// Coarse classification of a [`BuildError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildErrorKind {
    FileNotFound,
    ParseIncomplete,
    UnsupportedMaterialLayout,
    UnsupportedFormat,
    Gpu,
}

/// Error returned by [`crate::resources::build`]. No partial scene is ever returned.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("asset file {path} does not exist")]
    FileNotFound { path: PathBuf },
    #[error("failed to read asset file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("{path} has no root node")]
    NoRootNode { path: PathBuf },
    #[error("{path} was only partially imported")]
    Incomplete { path: PathBuf },
    #[error("mesh {mesh:?} is malformed: {reason}")]
    MalformedMesh { mesh: String, reason: String },
    #[error("unsupported asset format {extension:?} for {path}")]
    UnsupportedFormat { path: PathBuf, extension: String },
    #[error(transparent)]
    Material(#[from] MaterialError),
    #[error("failed to create GPU mesh")]
    Gpu(#[from] GpuError),
}

impl BuildError {
    pub fn kind(&self) -> BuildErrorKind {
        match self {
            BuildError::FileNotFound { .. } => BuildErrorKind::FileNotFound,
            BuildError::Io { .. }
            | BuildError::Parse { .. }
            | BuildError::NoRootNode { .. }
            | BuildError::Incomplete { .. }
            | BuildError::MalformedMesh { .. } => BuildErrorKind::ParseIncomplete,
            BuildError::UnsupportedFormat { .. } => BuildErrorKind::UnsupportedFormat,
            BuildError::Material(_) => BuildErrorKind::UnsupportedMaterialLayout,
            BuildError::Gpu(_) => BuildErrorKind::Gpu,
        }
    }
}
