// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Row Legalizer Library
//!
//! This library legalizes the output of a global placer: every standard cell,
//! multi-row cell and movable macro is moved onto a site of a placement row,
//! free of overlaps with other cells and fixed obstacles, with as little
//! displacement from its target position as a greedy search allows.

pub mod backend;
pub mod config;
pub mod error;
pub mod geometry;
pub mod io;
pub mod legalize;

// Re-export commonly used types
pub use backend::{backend_from_config, BackendKind, DevicePool, HostBackend, MemoryBackend};
pub use config::{BackendConfig, LegalizerConfig};
pub use error::{LegalizeError, Result};
pub use geometry::{Blank, Coord, Interval, Obstacle};
pub use legalize::{
    Cell, CellKind, CellPlacement, FailureReason, FreeSpaceIndex, LegalizationResult,
    LegalizationStats, Legalizer, OrderingStrategy, PlacementStatus, RowSpec,
};
