// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LegalizeError>;

#[derive(Debug, Error)]
pub enum LegalizeError {
    /// Malformed row, blank, obstacle or cell, or a `consume` outside its blank.
    /// Local to the affected row or cell.
    #[error("Invalid geometry: {message}")]
    InvalidGeometry { message: String },

    /// The memory backend could not allocate, copy or release a buffer.
    /// Aborts the run.
    #[error("Backend allocation error ({backend}): {message}")]
    BackendAllocation { backend: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl LegalizeError {
    pub fn geometry(message: impl Into<String>) -> Self {
        LegalizeError::InvalidGeometry {
            message: message.into(),
        }
    }

    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        LegalizeError::BackendAllocation {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn is_geometry(&self) -> bool {
        matches!(self, LegalizeError::InvalidGeometry { .. })
    }
}

impl From<toml::de::Error> for LegalizeError {
    fn from(err: toml::de::Error) -> Self {
        LegalizeError::Config(format!("TOML parse error: {err}"))
    }
}
