// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Greedy assignment loop
//!
//! Cells are visited once, in [`CellOrdering`] order. For each cell an x-window
//! around the target grows geometrically while the set of searched rows grows
//! by one row per step in both directions. The first step that finds any
//! feasible site commits the least-displacement one; a cell that finds none
//! within `max_search_iterations` steps is marked infeasible and the run goes on.

use std::cmp::Ordering;
use std::ops::Range;

use log::{debug, warn};
use num_traits::NumCast;
use rayon::prelude::*;

use super::{Cell, CellKind, CellOrdering, CellState, FailureReason, FreeSpaceIndex, MacroSpanResolver};
use crate::config::LegalizerConfig;
use crate::error::{LegalizeError, Result};
use crate::geometry::{Coord, Interval};

/// A feasible site for a cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate<T> {
    /// Bottom row of the band.
    pub row: usize,
    /// Distance in rows from the home row.
    pub offset: usize,
    pub x: T,
    /// `|x - target_x|`.
    pub dx: T,
}

impl<T: Coord> Candidate<T> {
    /// Smaller x-displacement, then nearer row, then leftmost x, then lower row.
    fn rank(&self, other: &Self) -> Ordering {
        self.dx
            .total_order(&other.dx)
            .then_with(|| self.offset.cmp(&other.offset))
            .then_with(|| self.x.total_order(&other.x))
            .then_with(|| self.row.cmp(&other.row))
    }
}

pub struct GreedyAssigner<'a> {
    config: &'a LegalizerConfig,
}

impl<'a> GreedyAssigner<'a> {
    pub fn new(config: &'a LegalizerConfig) -> Self {
        Self { config }
    }

    /// Check a cell's geometry against the index and decide which placement path it takes.
    pub fn classify<T: Coord>(&self, cell: &Cell<T>, index: &FreeSpaceIndex<T>) -> Result<CellKind> {
        let finite = [cell.width, cell.height, cell.target_x, cell.target_y]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(LegalizeError::geometry(format!(
                "cell {} has non-finite geometry",
                cell.id
            )));
        }
        if !(cell.width > T::zero()) || !(cell.height > T::zero()) {
            return Err(LegalizeError::geometry(format!(
                "cell {} has non-positive size {} x {}",
                cell.id, cell.width, cell.height
            )));
        }

        let (Some(home), Some(widest)) = (index.row_at_y(cell.target_y), index.widest_row()) else {
            return Err(LegalizeError::geometry("no usable placement rows"));
        };
        if cell.width > widest {
            return Err(LegalizeError::geometry(format!(
                "cell {} of width {} is wider than every row (widest {widest})",
                cell.id, cell.width
            )));
        }

        let row_height = index
            .row(home)
            .map(|r| r.height())
            .ok_or_else(|| LegalizeError::geometry(format!("row {home} out of range")))?;
        let rows = cell.height.ceil_ratio(row_height);
        if rows > index.usable_rows() {
            return Err(LegalizeError::geometry(format!(
                "cell {} spans {rows} rows but only {} rows are usable",
                cell.id,
                index.usable_rows()
            )));
        }

        Ok(if rows == 1 {
            CellKind::SingleRow
        } else if rows <= self.config.macro_row_threshold {
            CellKind::MultiRow { rows }
        } else {
            CellKind::MovableMacro { rows }
        })
    }

    /// `None` marks cells whose geometry is invalid.
    pub fn classify_all<T: Coord>(&self, cells: &[Cell<T>], index: &FreeSpaceIndex<T>) -> Vec<Option<CellKind>> {
        cells
            .iter()
            .map(|cell| self.classify(cell, index).ok())
            .collect()
    }

    /// Settle every cell. The returned states are parallel to `cells`.
    pub fn run<T: Coord>(
        &self,
        cells: &[Cell<T>],
        kinds: &[Option<CellKind>],
        index: &mut FreeSpaceIndex<T>,
    ) -> Vec<CellState<T>> {
        let mut states = vec![CellState::Unplaced; cells.len()];
        let order = CellOrdering::new(self.config.ordering)
            .with_macros_first(self.config.macros_first)
            .order(cells, kinds);

        for i in order {
            let cell = &cells[i];
            debug_assert!(!states[i].is_terminal(), "cell {} visited twice", cell.id);
            states[i] = match kinds.get(i).copied().flatten() {
                Some(kind) => self.place(cell, kind, index),
                None => {
                    let reason = match self.classify(cell, index) {
                        Err(e) => failure_message(e),
                        Ok(_) => "cell kind unavailable".to_string(),
                    };
                    debug!("[SKIP] cell {}: {reason}", cell.id);
                    CellState::Failed(FailureReason::InvalidGeometry(reason))
                }
            };
        }

        states
    }

    fn place<T: Coord>(&self, cell: &Cell<T>, kind: CellKind, index: &mut FreeSpaceIndex<T>) -> CellState<T> {
        let Some(candidate) = self.search(cell, kind, index) else {
            debug!(
                "[FAIL] cell {} ({} x {}) at ({}, {}): no site within search bound",
                cell.id, cell.width, cell.height, cell.target_x, cell.target_y
            );
            return CellState::Failed(FailureReason::Infeasible);
        };

        match commit(cell, kind.rows(), &candidate, index) {
            Ok(()) => CellState::Assigned {
                row: candidate.row,
                x: candidate.x,
            },
            Err(e) => {
                warn!("[WARN] cell {}: commit rejected: {e}", cell.id);
                CellState::Failed(FailureReason::InvalidGeometry(failure_message(e)))
            }
        }
    }

    /// Least-displacement feasible site for `cell`, or `None` once the search bound is exhausted.
    pub fn search<T: Coord>(&self, cell: &Cell<T>, kind: CellKind, index: &FreeSpaceIndex<T>) -> Option<Candidate<T>> {
        let home = index.row_at_y(cell.target_y)?;
        let site = index.row(home)?.site_width;
        let extent = index.x_extent()?;
        // Half-window that covers every usable row from the target
        let reach = cell
            .target_x
            .abs_diff_of(extent.low)
            .max_of(cell.target_x.abs_diff_of(extent.high))
            .max_of(site);
        let max_radius = self.config.max_row_radius.min(index.len());
        let rows = kind.rows();

        let mut half = initial_half_window(site, self.config.initial_window_sites, reach);
        for iteration in 0..self.config.max_search_iterations {
            let radius = iteration.min(max_radius);
            let window = Interval::new(cell.target_x - half, cell.target_x + half + cell.width);
            let starts = start_rows(home, radius, index.len());

            let best = if self.config.parallel {
                starts
                    .par_iter()
                    .filter_map(|&(row, offset)| evaluate(cell, rows, row, offset, window, index))
                    .min_by(|a, b| a.rank(b))
            } else {
                starts
                    .iter()
                    .filter_map(|&(row, offset)| evaluate(cell, rows, row, offset, window, index))
                    .min_by(|a, b| a.rank(b))
            };

            if best.is_some() {
                return best;
            }
            if half >= reach && radius == max_radius {
                break;
            }
            // Doubling saturates at `reach`
            half = if half >= reach - half { reach } else { half + half };
        }

        None
    }
}

/// `initial_window_sites` sites, or all of `reach` when that is shorter or not representable.
fn initial_half_window<T: Coord>(site: T, sites: usize, reach: T) -> T {
    match <T as NumCast>::from(sites) {
        Some(n) if n <= reach / site => site * n,
        _ => reach,
    }
}

fn failure_message(error: LegalizeError) -> String {
    match error {
        LegalizeError::InvalidGeometry { message } => message,
        other => other.to_string(),
    }
}

/// Start rows searched at `radius`: the home row, then alternately below and above.
fn start_rows(home: usize, radius: usize, len: usize) -> Vec<(usize, usize)> {
    let mut starts = vec![(home, 0)];
    for d in 1..=radius {
        if home >= d {
            starts.push((home - d, d));
        }
        if home + d < len {
            starts.push((home + d, d));
        }
    }
    starts
}

/// Best site for `cell` with its bottom edge on row `row`, restricted to `window`.
fn evaluate<T: Coord>(
    cell: &Cell<T>,
    rows: usize,
    row: usize,
    offset: usize,
    window: Interval<T>,
    index: &FreeSpaceIndex<T>,
) -> Option<Candidate<T>> {
    let base = index.row(row)?;
    let spans: Vec<Interval<T>> = if rows == 1 {
        index
            .query(row, window.low, window.high, cell.width)
            .into_iter()
            .map(|slot| slot.span)
            .collect()
    } else {
        let band = index.band(row, rows)?;
        MacroSpanResolver::new(index).common_spans(band, window, cell.width)
    };

    let (origin, site) = (base.xl_bound, base.site_width);
    let preferred = cell.target_x.snap_nearest(origin, site);
    spans
        .iter()
        .filter_map(|span| {
            // Float snapping may land a rounding error outside the span
            let lo = span.low.snap_up(origin, site).max_of(span.low);
            let last = span.high - cell.width;
            let hi = last.snap_down(origin, site).min_of(last);
            let x = preferred.min_of(hi).max_of(lo);
            (x + cell.width).approx_le(span.high).then_some(x)
        })
        .map(|x| Candidate {
            row,
            offset,
            x,
            dx: x.abs_diff_of(cell.target_x),
        })
        .min_by(|a, b| a.rank(b))
}

/// Consume the candidate's blank in every row of its band. All rows are checked before any changes.
fn commit<T: Coord>(
    cell: &Cell<T>,
    rows: usize,
    candidate: &Candidate<T>,
    index: &mut FreeSpaceIndex<T>,
) -> Result<()> {
    let band: Range<usize> = candidate.row..candidate.row + rows;
    if rows > 1 {
        MacroSpanResolver::new(index)
            .resolve_at(band.clone(), candidate.x, cell.width)
            .ok_or_else(|| {
                LegalizeError::geometry(format!(
                    "no common span of width {} at x {} in rows {band:?}",
                    cell.width, candidate.x
                ))
            })?;
    }

    let targets = band
        .map(|row| {
            index
                .locate(row, candidate.x, cell.width)
                .map(|blank| (row, blank))
                .ok_or_else(|| {
                    LegalizeError::geometry(format!(
                        "no blank encloses [{}, {}] in row {row}",
                        candidate.x,
                        candidate.x + cell.width
                    ))
                })
        })
        .collect::<Result<Vec<_>>>()?;

    for (row, blank) in targets {
        index.consume(row, blank, candidate.x, cell.width)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_half_window_saturates() {
        assert_eq!(initial_half_window(4i32, 8, 1000), 32);
        assert_eq!(initial_half_window(4i32, 1_000_000_000, 1000), 1000);
        assert_eq!(initial_half_window(4i32, usize::MAX, i32::MAX), i32::MAX);
        assert_eq!(initial_half_window(0.5f64, 3, 10.0), 1.5);
    }

    #[test]
    fn test_start_rows_alternate_and_clip() {
        assert_eq!(start_rows(0, 2, 5), vec![(0, 0), (1, 1), (2, 2)]);
        assert_eq!(start_rows(2, 2, 4), vec![(2, 0), (1, 1), (3, 1), (0, 2)]);
        assert_eq!(start_rows(1, 0, 3), vec![(1, 0)]);
    }
}
