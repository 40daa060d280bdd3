// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::backend::BackendKind;
use crate::error::{LegalizeError, Result};
use crate::legalize::ordering::OrderingStrategy;

/// Cells taller than this many rows are treated as movable macros.
pub const DEFAULT_MACRO_ROW_THRESHOLD: usize = 5;

/// Legalizer settings, loadable from TOML. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegalizerConfig {
    pub macro_row_threshold: usize,
    /// Number of window doublings before a cell is declared infeasible.
    pub max_search_iterations: usize,
    /// Half-width of the first search window, in sites.
    pub initial_window_sites: usize,
    /// Furthest row offset searched from the cell's home row.
    pub max_row_radius: usize,
    pub ordering: OrderingStrategy,
    pub macros_first: bool,
    /// Evaluate candidate rows on the rayon pool. Commits stay sequential.
    pub parallel: bool,
    pub backend: BackendConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub device_capacity_bytes: usize,
}

impl Default for LegalizerConfig {
    fn default() -> Self {
        Self {
            macro_row_threshold: DEFAULT_MACRO_ROW_THRESHOLD,
            max_search_iterations: 16,
            initial_window_sites: 8,
            max_row_radius: 10,
            ordering: OrderingStrategy::default(),
            macros_first: true,
            parallel: false,
            backend: BackendConfig::default(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Host,
            device_capacity_bytes: 256 * 1024 * 1024,
        }
    }
}

impl LegalizerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: LegalizerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            LegalizeError::Config(format!(
                "cannot read {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.macro_row_threshold == 0 {
            return Err(LegalizeError::Config(
                "macro_row_threshold must be at least 1".to_string(),
            ));
        }
        if self.max_search_iterations == 0 {
            return Err(LegalizeError::Config(
                "max_search_iterations must be at least 1".to_string(),
            ));
        }
        if self.initial_window_sites == 0 {
            return Err(LegalizeError::Config(
                "initial_window_sites must be at least 1".to_string(),
            ));
        }
        if self.backend.kind != BackendKind::Host && self.backend.device_capacity_bytes == 0 {
            return Err(LegalizeError::Config(format!(
                "device_capacity_bytes must be positive for the {} backend",
                self.backend.kind
            )));
        }
        Ok(())
    }
}
