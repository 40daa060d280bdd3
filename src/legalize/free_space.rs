// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Per-row free-space bookkeeping
//!
//! Each [`Row`] owns an ascending list of disjoint [`Blank`]s whose union is
//! exactly the row's unoccupied width. Blanks are created once from the row
//! bounds minus fixed obstacles; afterwards they are only split or removed by
//! [`FreeSpaceIndex::consume`].

use std::ops::Range;

use itertools::Itertools;
use log::debug;

use super::{GeometryIssue, IssueSource, RowSpec};
use crate::error::{LegalizeError, Result};
use crate::geometry::{Blank, Coord, Interval, Obstacle};

/// A blank (by index in its row) together with the part of it inside a query window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlankSlot<T> {
    pub blank: usize,
    pub span: Interval<T>,
}

#[derive(Debug, Clone)]
pub struct Row<T> {
    pub yl: T,
    pub yh: T,
    pub site_width: T,
    pub xl_bound: T,
    pub xh_bound: T,
    blanks: Vec<Blank<T>>,
    obstacle_width: T,
    assigned_width: T,
    enabled: bool,
}

impl<T: Coord> Row<T> {
    fn disabled(spec: &RowSpec<T>) -> Self {
        Self {
            yl: spec.yl,
            yh: spec.yh,
            site_width: spec.site_width,
            xl_bound: spec.xl_bound,
            xh_bound: spec.xh_bound,
            blanks: Vec::new(),
            obstacle_width: T::zero(),
            assigned_width: T::zero(),
            enabled: false,
        }
    }

    fn validate(spec: &RowSpec<T>) -> Result<()> {
        let finite = [spec.yl, spec.yh, spec.site_width, spec.xl_bound, spec.xh_bound]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(LegalizeError::geometry("row has non-finite coordinates"));
        }
        if spec.xl_bound > spec.xh_bound {
            return Err(LegalizeError::geometry(format!(
                "row x-bounds inverted: xl {} > xh {}",
                spec.xl_bound, spec.xh_bound
            )));
        }
        if spec.yl >= spec.yh {
            return Err(LegalizeError::geometry(format!(
                "row has non-positive height: yl {} >= yh {}",
                spec.yl, spec.yh
            )));
        }
        if spec.site_width <= T::zero() {
            return Err(LegalizeError::geometry(format!(
                "row has non-positive site width {}",
                spec.site_width
            )));
        }
        Ok(())
    }

    /// Row span minus the merged x-extent of every obstacle overlapping it.
    fn build(spec: &RowSpec<T>, obstacles: &[Obstacle<T>]) -> Self {
        let bounds = Interval::new(spec.xl_bound, spec.xh_bound);
        let blocked: Vec<Interval<T>> = obstacles
            .iter()
            .filter(|o| o.overlaps_rows(spec.yl, spec.yh))
            .map(|o| Interval::new(o.xl, o.xh).intersect(&bounds))
            .filter(|iv| iv.low < iv.high)
            .sorted_by(|a, b| a.low.total_order(&b.low))
            .coalesce(|prev, next| {
                if next.low <= prev.high {
                    Ok(Interval::new(prev.low, prev.high.max_of(next.high)))
                } else {
                    Err((prev, next))
                }
            })
            .collect();

        let mut blanks = Vec::with_capacity(blocked.len() + 1);
        let mut cursor = spec.xl_bound;
        let mut obstacle_width = T::zero();
        for iv in &blocked {
            if iv.low > cursor {
                blanks.push(Blank::new(cursor, spec.yl, iv.low, spec.yh));
            }
            obstacle_width = obstacle_width + iv.width();
            cursor = cursor.max_of(iv.high);
        }
        if cursor < spec.xh_bound {
            blanks.push(Blank::new(cursor, spec.yl, spec.xh_bound, spec.yh));
        }

        Self {
            blanks,
            obstacle_width,
            enabled: true,
            ..Self::disabled(spec)
        }
    }

    pub fn blanks(&self) -> &[Blank<T>] {
        &self.blanks
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn height(&self) -> T {
        self.yh - self.yl
    }

    pub fn span(&self) -> T {
        self.xh_bound - self.xl_bound
    }

    pub fn free_width(&self) -> T {
        self.blanks
            .iter()
            .fold(T::zero(), |acc, blank| acc + blank.width())
    }

    pub fn obstacle_width(&self) -> T {
        self.obstacle_width
    }

    pub fn assigned_width(&self) -> T {
        self.assigned_width
    }

    /// Free width before any cell was assigned.
    pub fn original_free_width(&self) -> T {
        if self.enabled {
            self.span() - self.obstacle_width
        } else {
            T::zero()
        }
    }

    pub fn query(&self, x_min: T, x_max: T, min_width: T) -> Vec<BlankSlot<T>> {
        let window = Interval::new(x_min, x_max);
        let start = self.blanks.partition_point(|b| b.xh < x_min);
        self.blanks[start..]
            .iter()
            .enumerate()
            .take_while(|(_, b)| b.xl <= x_max)
            .filter_map(|(offset, b)| {
                let span = b.x_interval().intersect(&window);
                (!span.is_empty() && min_width.approx_le(span.width())).then_some(BlankSlot {
                    blank: start + offset,
                    span,
                })
            })
            .collect()
    }

    /// Index of the blank containing the point `x`.
    pub fn blank_at(&self, x: T) -> Option<usize> {
        let i = self.blanks.partition_point(|b| b.xh < x);
        (i < self.blanks.len() && self.blanks[i].xl <= x).then_some(i)
    }

    /// Index of the blank enclosing `[x, x + width]`. The right edge may overshoot by float rounding.
    pub fn locate(&self, x: T, width: T) -> Option<usize> {
        let right = x + width;
        let i = self.blanks.partition_point(|b| !right.approx_le(b.xh));
        (i < self.blanks.len() && self.blanks[i].xl <= x).then_some(i)
    }

    pub fn consume(&mut self, blank_ref: usize, chosen_x: T, width: T) -> Result<()> {
        if !self.enabled {
            return Err(LegalizeError::geometry("consume on a disabled row"));
        }
        if !(width > T::zero()) {
            return Err(LegalizeError::geometry(format!(
                "consume width must be positive, got {width}"
            )));
        }
        let blank = *self.blanks.get(blank_ref).ok_or_else(|| {
            LegalizeError::geometry(format!(
                "blank {blank_ref} does not exist ({} blanks in row)",
                self.blanks.len()
            ))
        })?;
        let right = chosen_x + width;
        if chosen_x < blank.xl || !right.approx_le(blank.xh) {
            return Err(LegalizeError::geometry(format!(
                "assignment [{chosen_x}, {right}] exceeds blank [{}, {}]",
                blank.xl, blank.xh
            )));
        }

        let mut remainders = Vec::with_capacity(2);
        // Rounding slivers are not kept as blanks
        if !chosen_x.approx_le(blank.xl) {
            remainders.push(Blank::new(blank.xl, blank.yl, chosen_x, blank.yh));
        }
        if !blank.xh.approx_le(right) {
            remainders.push(Blank::new(right, blank.yl, blank.xh, blank.yh));
        }
        self.blanks.splice(blank_ref..=blank_ref, remainders);
        self.assigned_width = self.assigned_width + width;
        Ok(())
    }

    /// Order, disjointness and containment of the blank list.
    pub fn check_invariants(&self) -> Result<()> {
        for blank in &self.blanks {
            if !(blank.xl < blank.xh) {
                return Err(LegalizeError::geometry(format!(
                    "empty or inverted blank [{}, {}]",
                    blank.xl, blank.xh
                )));
            }
            if blank.xl < self.xl_bound || blank.xh > self.xh_bound {
                return Err(LegalizeError::geometry(format!(
                    "blank [{}, {}] outside row bounds [{}, {}]",
                    blank.xl, blank.xh, self.xl_bound, self.xh_bound
                )));
            }
            if blank.yl != self.yl || blank.yh != self.yh {
                return Err(LegalizeError::geometry("blank y-range differs from its row"));
            }
        }
        for (prev, next) in self.blanks.iter().tuple_windows() {
            if next.xl < prev.xh {
                return Err(LegalizeError::geometry(format!(
                    "blanks [{}, {}] and [{}, {}] overlap or are out of order",
                    prev.xl, prev.xh, next.xl, next.xh
                )));
            }
        }
        Ok(())
    }
}

/// Free-space index over all placement rows, indexed as supplied by the caller.
#[derive(Debug)]
pub struct FreeSpaceIndex<T> {
    rows: Vec<Row<T>>,
    /// Enabled rows, ascending in `yl`.
    lookup: Vec<usize>,
    issues: Vec<GeometryIssue>,
}

impl<T: Coord> FreeSpaceIndex<T> {
    /// Malformed rows stay in place without blanks so row indices remain stable.
    pub fn new(rows: &[RowSpec<T>], obstacles: &[Obstacle<T>]) -> Self {
        let mut issues = Vec::new();

        let valid_obstacles: Vec<Obstacle<T>> = obstacles
            .iter()
            .enumerate()
            .filter_map(|(i, o)| {
                if o.is_valid() {
                    Some(*o)
                } else {
                    issues.push(GeometryIssue {
                        source: IssueSource::Obstacle(i),
                        error: LegalizeError::geometry(format!(
                            "obstacle [{}, {}] x [{}, {}] is inverted or non-finite",
                            o.xl, o.xh, o.yl, o.yh
                        )),
                    });
                    None
                }
            })
            .collect();

        let mut built = Vec::with_capacity(rows.len());
        let mut lookup = Vec::with_capacity(rows.len());
        let mut last_yh: Option<T> = None;

        for (i, spec) in rows.iter().enumerate() {
            let checked = Row::validate(spec).and_then(|_| match last_yh {
                Some(prev) if spec.yl < prev => Err(LegalizeError::geometry(format!(
                    "row yl {} overlaps or precedes the previous row ending at {prev}",
                    spec.yl
                ))),
                _ => Ok(()),
            });

            match checked {
                Ok(()) => {
                    last_yh = Some(spec.yh);
                    lookup.push(i);
                    built.push(Row::build(spec, &valid_obstacles));
                }
                Err(error) => {
                    issues.push(GeometryIssue {
                        source: IssueSource::Row(i),
                        error,
                    });
                    built.push(Row::disabled(spec));
                }
            }
        }

        debug!(
            "[INDEX] {} rows ({} usable), {} obstacles, {} issues",
            built.len(),
            lookup.len(),
            valid_obstacles.len(),
            issues.len()
        );

        Self {
            rows: built,
            lookup,
            issues,
        }
    }

    pub fn rows(&self) -> &[Row<T>] {
        &self.rows
    }

    pub fn row(&self, row: usize) -> Option<&Row<T>> {
        self.rows.get(row)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn usable_rows(&self) -> usize {
        self.lookup.len()
    }

    pub fn issues(&self) -> &[GeometryIssue] {
        &self.issues
    }

    pub fn take_issues(&mut self) -> Vec<GeometryIssue> {
        std::mem::take(&mut self.issues)
    }

    /// Blanks of `row` overlapping `[x_min, x_max]`, clipped to it, at least `min_width` wide.
    pub fn query(&self, row: usize, x_min: T, x_max: T, min_width: T) -> Vec<BlankSlot<T>> {
        self.rows
            .get(row)
            .map(|r| r.query(x_min, x_max, min_width))
            .unwrap_or_default()
    }

    /// Place `[chosen_x, chosen_x + width]` inside blank `blank_ref` of `row`.
    pub fn consume(&mut self, row: usize, blank_ref: usize, chosen_x: T, width: T) -> Result<()> {
        let len = self.rows.len();
        self.rows
            .get_mut(row)
            .ok_or_else(|| LegalizeError::geometry(format!("row {row} out of range ({len} rows)")))?
            .consume(blank_ref, chosen_x, width)
    }

    pub fn locate(&self, row: usize, x: T, width: T) -> Option<usize> {
        self.rows.get(row).and_then(|r| r.locate(x, width))
    }

    /// Row whose `[yl, yh)` contains `y`; otherwise the nearest usable row.
    pub fn row_at_y(&self, y: T) -> Option<usize> {
        let first = *self.lookup.first()?;
        let p = self.lookup.partition_point(|&i| self.rows[i].yl <= y);
        if p == 0 {
            return Some(first);
        }
        let below = self.lookup[p - 1];
        if y < self.rows[below].yh {
            return Some(below);
        }
        match self.lookup.get(p) {
            Some(&above) => {
                let gap_below = y - self.rows[below].yh;
                let gap_above = self.rows[above].yl - y;
                if gap_above < gap_below {
                    Some(above)
                } else {
                    Some(below)
                }
            }
            None => Some(below),
        }
    }

    /// `start..start + k` when those rows exist, are usable and stack without gaps.
    pub fn band(&self, start: usize, k: usize) -> Option<Range<usize>> {
        if k == 0 || start + k > self.rows.len() {
            return None;
        }
        let rows = &self.rows[start..start + k];
        if !rows.iter().all(|r| r.enabled) {
            return None;
        }
        let contiguous = rows.iter().tuple_windows().all(|(a, b)| a.yh == b.yl);
        contiguous.then_some(start..start + k)
    }

    /// Widest usable row span.
    pub fn widest_row(&self) -> Option<T> {
        self.lookup
            .iter()
            .map(|&i| self.rows[i].span())
            .reduce(|a, b| a.max_of(b))
    }

    /// Union of the usable rows' x-bounds.
    pub fn x_extent(&self) -> Option<Interval<T>> {
        self.lookup
            .iter()
            .map(|&i| Interval::new(self.rows[i].xl_bound, self.rows[i].xh_bound))
            .reduce(|a, b| Interval::new(a.low.min_of(b.low), a.high.max_of(b.high)))
    }
}
