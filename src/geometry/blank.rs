// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

use serde::{Deserialize, Serialize};

use super::{Coord, Interval};

/// Free axis-aligned rectangle confined to one placement row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Blank<T> {
    pub xl: T,
    pub yl: T,
    pub xh: T,
    pub yh: T,
}

impl<T: Coord> Blank<T> {
    pub fn new(xl: T, yl: T, xh: T, yh: T) -> Self {
        Self { xl, yl, xh, yh }
    }

    /// Shrink to the common area on both axes.
    pub fn intersect(&mut self, rhs: &Self) {
        self.xl = self.xl.max_of(rhs.xl);
        self.xh = self.xh.min_of(rhs.xh);
        self.yl = self.yl.max_of(rhs.yl);
        self.yh = self.yh.min_of(rhs.yh);
    }

    pub fn width(&self) -> T {
        self.x_interval().width()
    }

    pub fn x_interval(&self) -> Interval<T> {
        Interval::new(self.xl, self.xh)
    }

    pub fn is_valid(&self) -> bool {
        self.xl <= self.xh && self.yl <= self.yh
    }
}

/// A fixed rectangle subtracted from the rows it overlaps before legalization starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle<T> {
    pub xl: T,
    pub yl: T,
    pub xh: T,
    pub yh: T,
}

impl<T: Coord> Obstacle<T> {
    pub fn new(xl: T, yl: T, xh: T, yh: T) -> Self {
        Self { xl, yl, xh, yh }
    }

    pub fn is_valid(&self) -> bool {
        self.xl.is_finite()
            && self.xh.is_finite()
            && self.yl.is_finite()
            && self.yh.is_finite()
            && self.xl <= self.xh
            && self.yl <= self.yh
    }

    /// True when the obstacle covers a strictly positive height of `[yl, yh)`.
    pub fn overlaps_rows(&self, yl: T, yh: T) -> bool {
        self.yl < yh && self.yh > yl
    }
}
