//! Errors raised while loading, saving and building parameter files and presets.

use std::path::PathBuf;

use periphery_core::{LineError, ParamError};
use thiserror::Error;

/// Errors from parameter files, presets and the registry underneath them.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A parameter or preset file could not be read
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A parameter or preset file could not be written
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The parent directory could not be created
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        /// Directory path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A preset file is not valid TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A preset could not be turned into TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Unknown module type
    #[error("unknown module type: {0}")]
    UnknownModule(String),

    /// A parameter file line could not be applied
    #[error("{path}: {source}")]
    ParFile {
        /// Parameter file.
        path: PathBuf,
        /// Failing line.
        #[source]
        source: LineError,
    },

    /// Parameter text could not be applied
    #[error(transparent)]
    Line(#[from] LineError),

    /// A preset step could not be built or validated
    #[error("step '{label}': {source}")]
    Step {
        /// Step label.
        label: String,
        /// Registry error.
        #[source]
        source: ParamError,
    },

    /// Registry error outside any step or line
    #[error(transparent)]
    Param(#[from] ParamError),
}

impl ConfigError {
    /// Wrap a read failure on `path`.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Wrap a write failure on `path`.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Wrap a directory-creation failure on `path`.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::CreateDir {
            path: path.into(),
            source,
        }
    }

    /// Tag a registry error with the step it came from.
    pub fn step(label: impl Into<String>, source: ParamError) -> Self {
        ConfigError::Step {
            label: label.into(),
            source,
        }
    }

    /// The registry error underneath, if any.
    pub fn param_error(&self) -> Option<&ParamError> {
        match self {
            ConfigError::ParFile { source, .. } | ConfigError::Line(source) => {
                Some(&source.source)
            }
            ConfigError::Step { source, .. } | ConfigError::Param(source) => Some(source),
            _ => None,
        }
    }
}
