// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Greedy row legalization
//!
//! Converts an overlapping, off-grid placement into one where every cell sits
//! on a site of a placement row, inside the row bounds and clear of every
//! other cell and fixed obstacle, while keeping each cell as close as possible
//! to its target position.

pub mod assigner;
pub mod free_space;
pub mod macro_span;
pub mod ordering;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::backend::{round_trip, MemoryBackend};
use crate::config::LegalizerConfig;
use crate::error::{LegalizeError, Result};
use crate::geometry::{Coord, Obstacle};

pub use assigner::GreedyAssigner;
pub use free_space::{BlankSlot, FreeSpaceIndex, Row};
pub use macro_span::MacroSpanResolver;
pub use ordering::{CellOrdering, OrderingStrategy};

/// Geometry of one placement row as supplied by the row database.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RowSpec<T> {
    pub yl: T,
    pub yh: T,
    pub site_width: T,
    #[serde(rename = "xl")]
    pub xl_bound: T,
    #[serde(rename = "xh")]
    pub xh_bound: T,
}

/// A movable cell with the position produced by global placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cell<T> {
    pub id: usize,
    pub width: T,
    pub height: T,
    #[serde(rename = "x")]
    pub target_x: T,
    #[serde(rename = "y")]
    pub target_y: T,
    #[serde(default)]
    pub priority: i32,
}

impl<T: Coord> Cell<T> {
    pub fn new(id: usize, width: T, height: T, target_x: T, target_y: T) -> Self {
        Self {
            id,
            width,
            height,
            target_x,
            target_y,
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    SingleRow,
    MultiRow { rows: usize },
    MovableMacro { rows: usize },
}

impl CellKind {
    pub fn rows(&self) -> usize {
        match self {
            CellKind::SingleRow => 1,
            CellKind::MultiRow { rows } | CellKind::MovableMacro { rows } => *rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FailureReason {
    /// No free slot within the bounded search.
    Infeasible,
    InvalidGeometry(String),
}

/// Per-cell state. `Assigned` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum CellState<T> {
    Unplaced,
    Assigned { row: usize, x: T },
    Failed(FailureReason),
}

impl<T: Coord> CellState<T> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CellState::Unplaced)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementStatus {
    Assigned,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellPlacement<T> {
    pub id: usize,
    pub status: PlacementStatus,
    pub assigned_row: Option<usize>,
    pub assigned_x: Option<T>,
    pub assigned_y: Option<T>,
    /// Manhattan distance from the target position.
    pub displacement: Option<T>,
    pub failure: Option<FailureReason>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSource {
    Row(usize),
    Obstacle(usize),
}

/// A geometry problem found while building the free-space index.
#[derive(Debug)]
pub struct GeometryIssue {
    pub source: IssueSource,
    pub error: LegalizeError,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LegalizationStats {
    pub assigned: usize,
    pub failed: usize,
    pub invalid: usize,
    pub movable_macros: usize,
    pub total_displacement: f64,
    pub max_displacement: f64,
}

#[derive(Debug)]
pub struct LegalizationResult<T> {
    /// One entry per input cell, in input order.
    pub placements: Vec<CellPlacement<T>>,
    pub issues: Vec<GeometryIssue>,
    pub stats: LegalizationStats,
}

impl<T: Coord> LegalizationResult<T> {
    pub fn placement(&self, id: usize) -> Option<&CellPlacement<T>> {
        self.placements.iter().find(|p| p.id == id)
    }

    pub fn failed_ids(&self) -> Vec<usize> {
        self.placements
            .iter()
            .filter(|p| p.status == PlacementStatus::Failed)
            .map(|p| p.id)
            .collect()
    }
}

pub struct Legalizer {
    config: LegalizerConfig,
}

impl Legalizer {
    pub fn new(config: LegalizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LegalizerConfig {
        &self.config
    }

    /// Stage the design through `backend`, build the free-space index and legalize every cell.
    ///
    /// Backend failures abort with [`LegalizeError::BackendAllocation`]. Geometry problems
    /// and infeasible cells are reported in the result instead.
    pub fn run<T: Coord>(
        &self,
        cells: &[Cell<T>],
        rows: &[RowSpec<T>],
        obstacles: &[Obstacle<T>],
        backend: &mut dyn MemoryBackend,
    ) -> Result<LegalizationResult<T>> {
        info!(
            "[LEGALIZE] {} cells, {} rows, {} obstacles on {} backend",
            cells.len(),
            rows.len(),
            obstacles.len(),
            backend.kind()
        );

        let cells = stage_cells(backend, cells)?;
        let rows = stage_rows(backend, rows)?;

        let mut index = FreeSpaceIndex::new(&rows, obstacles);
        let result = self.run_with_index(&cells, &mut index);

        // Results go back through the backend the same way the inputs came in
        let assigned_x: Vec<T> = result
            .placements
            .iter()
            .map(|p| p.assigned_x.unwrap_or_else(T::zero))
            .collect();
        let fetched = round_trip(backend, &assigned_x)?;
        if fetched != assigned_x {
            return Err(LegalizeError::backend(
                backend.kind().to_string(),
                "result array corrupted during staging",
            ));
        }

        Ok(result)
    }

    /// Legalize `cells` against an already built index.
    pub fn run_with_index<T: Coord>(
        &self,
        cells: &[Cell<T>],
        index: &mut FreeSpaceIndex<T>,
    ) -> LegalizationResult<T> {
        let issues = index.take_issues();
        for issue in &issues {
            warn!("[WARN] {:?}: {}", issue.source, issue.error);
        }

        let assigner = GreedyAssigner::new(&self.config);
        let kinds = assigner.classify_all(cells, index);
        let states = assigner.run(cells, &kinds, index);

        let mut stats = LegalizationStats {
            movable_macros: kinds
                .iter()
                .filter(|k| matches!(k, Some(CellKind::MovableMacro { .. })))
                .count(),
            ..Default::default()
        };

        let placements: Vec<CellPlacement<T>> = cells
            .iter()
            .zip(states)
            .map(|(cell, state)| to_placement(cell, state, index, &mut stats))
            .collect();

        info!(
            "[INFO] Legalized {} cells, {} failed ({} invalid), total displacement {:.3}, max {:.3}",
            stats.assigned,
            stats.failed,
            stats.invalid,
            stats.total_displacement,
            stats.max_displacement
        );

        LegalizationResult {
            placements,
            issues,
            stats,
        }
    }
}

fn to_placement<T: Coord>(
    cell: &Cell<T>,
    state: CellState<T>,
    index: &FreeSpaceIndex<T>,
    stats: &mut LegalizationStats,
) -> CellPlacement<T> {
    match state {
        CellState::Assigned { row, x } => {
            let y = index.row(row).map(|r| r.yl).unwrap_or(cell.target_y);
            let displacement = x.abs_diff_of(cell.target_x) + y.abs_diff_of(cell.target_y);
            stats.assigned += 1;
            let distance = displacement.to_f64().unwrap_or_default();
            stats.total_displacement += distance;
            stats.max_displacement = stats.max_displacement.max(distance);
            CellPlacement {
                id: cell.id,
                status: PlacementStatus::Assigned,
                assigned_row: Some(row),
                assigned_x: Some(x),
                assigned_y: Some(y),
                displacement: Some(displacement),
                failure: None,
            }
        }
        CellState::Failed(reason) => {
            stats.failed += 1;
            if matches!(reason, FailureReason::InvalidGeometry(_)) {
                stats.invalid += 1;
            }
            CellPlacement {
                id: cell.id,
                status: PlacementStatus::Failed,
                assigned_row: None,
                assigned_x: None,
                assigned_y: None,
                displacement: None,
                failure: Some(reason),
            }
        }
        // The assigner settles every cell; anything else is a failure to place it
        CellState::Unplaced => {
            stats.failed += 1;
            CellPlacement {
                id: cell.id,
                status: PlacementStatus::Failed,
                assigned_row: None,
                assigned_x: None,
                assigned_y: None,
                displacement: None,
                failure: Some(FailureReason::Infeasible),
            }
        }
    }
}

fn stage_cells<T: Coord>(backend: &mut dyn MemoryBackend, cells: &[Cell<T>]) -> Result<Vec<Cell<T>>> {
    let widths = round_trip(backend, &cells.iter().map(|c| c.width).collect::<Vec<_>>())?;
    let heights = round_trip(backend, &cells.iter().map(|c| c.height).collect::<Vec<_>>())?;
    let xs = round_trip(backend, &cells.iter().map(|c| c.target_x).collect::<Vec<_>>())?;
    let ys = round_trip(backend, &cells.iter().map(|c| c.target_y).collect::<Vec<_>>())?;

    Ok(cells
        .iter()
        .enumerate()
        .map(|(i, cell)| Cell {
            width: widths[i],
            height: heights[i],
            target_x: xs[i],
            target_y: ys[i],
            ..*cell
        })
        .collect())
}

fn stage_rows<T: Coord>(backend: &mut dyn MemoryBackend, rows: &[RowSpec<T>]) -> Result<Vec<RowSpec<T>>> {
    let yl = round_trip(backend, &rows.iter().map(|r| r.yl).collect::<Vec<_>>())?;
    let yh = round_trip(backend, &rows.iter().map(|r| r.yh).collect::<Vec<_>>())?;
    let site = round_trip(backend, &rows.iter().map(|r| r.site_width).collect::<Vec<_>>())?;
    let xl = round_trip(backend, &rows.iter().map(|r| r.xl_bound).collect::<Vec<_>>())?;
    let xh = round_trip(backend, &rows.iter().map(|r| r.xh_bound).collect::<Vec<_>>())?;

    Ok((0..rows.len())
        .map(|i| RowSpec {
            yl: yl[i],
            yh: yh[i],
            site_width: site[i],
            xl_bound: xl[i],
            xh_bound: xh[i],
        })
        .collect())
}
