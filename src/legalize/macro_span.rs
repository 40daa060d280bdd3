// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Common free space across a band of rows
//!
//! A cell spanning `k` rows fits at `x` only if every row of its band is free
//! there. The resolver folds the per-row free intervals with
//! [`Interval::intersect`] until one common range per candidate remains.

use std::ops::Range;

use super::FreeSpaceIndex;
use crate::geometry::{intersect_sorted, Coord, Interval};

pub struct MacroSpanResolver<'a, T> {
    index: &'a FreeSpaceIndex<T>,
}

impl<'a, T: Coord> MacroSpanResolver<'a, T> {
    pub fn new(index: &'a FreeSpaceIndex<T>) -> Self {
        Self { index }
    }

    /// Intersection of the blanks containing `x` in every row of `band`,
    /// or `None` when some row has no blank there or the common range is narrower than `width`.
    pub fn resolve_at(&self, band: Range<usize>, x: T, width: T) -> Option<Interval<T>> {
        let mut common: Option<Interval<T>> = None;
        for row in band {
            let row = self.index.row(row)?;
            let blank = row.blanks()[row.blank_at(x)?].x_interval();
            let next = match common {
                Some(acc) => acc.intersect(&blank),
                None => blank,
            };
            if next.is_empty() {
                return None;
            }
            common = Some(next);
        }
        common.filter(|iv| width.approx_le(iv.width()))
    }

    /// All ranges inside `window` that are free in every row of `band` and at least `width` wide,
    /// in ascending order.
    pub fn common_spans(&self, band: Range<usize>, window: Interval<T>, width: T) -> Vec<Interval<T>> {
        let mut rows = band;
        let Some(first) = rows.next() else {
            return Vec::new();
        };
        let mut spans: Vec<Interval<T>> = self
            .index
            .query(first, window.low, window.high, width)
            .into_iter()
            .map(|slot| slot.span)
            .collect();

        for row in rows {
            if spans.is_empty() {
                break;
            }
            let next: Vec<Interval<T>> = self
                .index
                .query(row, window.low, window.high, width)
                .into_iter()
                .map(|slot| slot.span)
                .collect();
            spans = intersect_sorted(&spans, &next, width);
        }

        spans
    }
}
