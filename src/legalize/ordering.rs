// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Processing order of cells
//!
//! The greedy assigner never revisits a placement, so the order in which cells
//! are visited decides the result. Every strategy is a total order (ties end on
//! cell id, then input position) so identical inputs give identical outputs.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Cell, CellKind};
use crate::geometry::Coord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingStrategy {
    /// Ascending target x, wider cells first, then id.
    #[default]
    TargetX,
    /// Ascending target y, then as `TargetX`.
    RowMajor,
    /// Larger area first, then ascending target x.
    Size,
    /// Higher priority first, then as `TargetX`.
    Priority,
}

impl fmt::Display for OrderingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderingStrategy::TargetX => "target_x",
            OrderingStrategy::RowMajor => "row_major",
            OrderingStrategy::Size => "size",
            OrderingStrategy::Priority => "priority",
        };
        write!(f, "{name}")
    }
}

impl FromStr for OrderingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "target_x" | "x" => Ok(OrderingStrategy::TargetX),
            "row_major" | "y" => Ok(OrderingStrategy::RowMajor),
            "size" | "area" => Ok(OrderingStrategy::Size),
            "priority" => Ok(OrderingStrategy::Priority),
            other => Err(format!(
                "unknown ordering strategy '{other}' (expected target_x, row_major, size or priority)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CellOrdering {
    strategy: OrderingStrategy,
    macros_first: bool,
}

impl CellOrdering {
    pub fn new(strategy: OrderingStrategy) -> Self {
        Self {
            strategy,
            macros_first: false,
        }
    }

    /// Schedule movable macros, then other multi-row cells, ahead of single-row cells.
    pub fn with_macros_first(mut self, macros_first: bool) -> Self {
        self.macros_first = macros_first;
        self
    }

    pub fn strategy(&self) -> OrderingStrategy {
        self.strategy
    }

    /// Indices into `cells` in processing order. `kinds` is parallel to `cells`;
    /// cells with unknown kind (`None`) rank with the single-row group.
    pub fn order<T: Coord>(&self, cells: &[Cell<T>], kinds: &[Option<CellKind>]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..cells.len()).collect();
        order.sort_by(|&a, &b| {
            self.group_rank(kinds.get(a).copied().flatten())
                .cmp(&self.group_rank(kinds.get(b).copied().flatten()))
                .then_with(|| self.compare(&cells[a], &cells[b]))
                .then_with(|| cells[a].id.cmp(&cells[b].id))
                .then_with(|| a.cmp(&b))
        });
        order
    }

    fn group_rank(&self, kind: Option<CellKind>) -> u8 {
        if !self.macros_first {
            return 0;
        }
        match kind {
            Some(CellKind::MovableMacro { .. }) => 0,
            Some(CellKind::MultiRow { .. }) => 1,
            _ => 2,
        }
    }

    fn compare<T: Coord>(&self, a: &Cell<T>, b: &Cell<T>) -> Ordering {
        let by_x = |a: &Cell<T>, b: &Cell<T>| {
            a.target_x
                .total_order(&b.target_x)
                .then_with(|| b.width.total_order(&a.width))
        };
        match self.strategy {
            OrderingStrategy::TargetX => by_x(a, b),
            OrderingStrategy::RowMajor => a
                .target_y
                .total_order(&b.target_y)
                .then_with(|| by_x(a, b)),
            OrderingStrategy::Size => (b.width * b.height)
                .total_order(&(a.width * a.height))
                .then_with(|| a.target_x.total_order(&b.target_x)),
            OrderingStrategy::Priority => b.priority.cmp(&a.priority).then_with(|| by_x(a, b)),
        }
    }
}
