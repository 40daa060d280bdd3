// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Numeric coordinate abstraction
//!
//! Every geometric type in the crate is generic over a single coordinate type.
//! Comparisons, site snapping and byte encoding are defined here once so the
//! free-space bookkeeping reads the same for integer and floating-point
//! databases.

use std::cmp::Ordering;
use std::fmt::{Debug, Display};

use num_traits::{Num, NumCast};

use crate::backend::ElementType;

/// Relative tolerance used when snapping floating-point coordinates to a site grid.
const SNAP_EPS: f64 = 1e-9;

pub trait Coord:
    Num + NumCast + Copy + Default + PartialOrd + Debug + Display + Send + Sync + 'static
{
    /// Element type used when staging arrays of this coordinate through a memory backend.
    const ELEMENT: ElementType;

    /// Parsed text value on this grid. Integer coordinates round to nearest;
    /// `None` when the value does not fit.
    fn from_f64_rounded(value: f64) -> Option<Self> {
        match Self::ELEMENT {
            ElementType::I32 | ElementType::I64 => <Self as NumCast>::from(value.round()),
            ElementType::F32 | ElementType::F64 => <Self as NumCast>::from(value),
        }
    }

    fn is_finite(self) -> bool {
        self.to_f64().is_some_and(f64::is_finite)
    }

    /// Total order, NaN-safe for floats.
    fn total_order(&self, other: &Self) -> Ordering;

    /// Largest grid position `origin + n * step` that is `<= self`.
    fn snap_down(self, origin: Self, step: Self) -> Self;

    /// Smallest grid position `origin + n * step` that is `>= self`.
    fn snap_up(self, origin: Self, step: Self) -> Self;

    /// Number of `unit`s needed to cover `self`, at least one.
    fn ceil_ratio(self, unit: Self) -> usize;

    /// `self <= other`, allowing the rounding error of float arithmetic.
    fn approx_le(self, other: Self) -> bool;

    fn write_le(self, out: &mut Vec<u8>);

    fn read_le(bytes: &[u8]) -> Option<Self>;

    fn max_of(self, other: Self) -> Self {
        if self.total_order(&other) == Ordering::Less {
            other
        } else {
            self
        }
    }

    fn min_of(self, other: Self) -> Self {
        if other.total_order(&self) == Ordering::Less {
            other
        } else {
            self
        }
    }

    fn abs_diff_of(self, other: Self) -> Self {
        if self.total_order(&other) == Ordering::Less {
            other - self
        } else {
            self - other
        }
    }

    /// Grid position closest to `self`; ties resolve to the lower position.
    fn snap_nearest(self, origin: Self, step: Self) -> Self {
        let down = self.snap_down(origin, step);
        let up = self.snap_up(origin, step);
        if (up - self).total_order(&(self - down)) == Ordering::Less {
            up
        } else {
            down
        }
    }
}

macro_rules! impl_coord_int {
    ($($t:ty => $elem:expr),* $(,)?) => {
        $(
            impl Coord for $t {
                const ELEMENT: ElementType = $elem;

                fn total_order(&self, other: &Self) -> Ordering {
                    self.cmp(other)
                }

                fn snap_down(self, origin: Self, step: Self) -> Self {
                    if step <= 0 {
                        return self;
                    }
                    origin + (self - origin).div_euclid(step) * step
                }

                fn snap_up(self, origin: Self, step: Self) -> Self {
                    if step <= 0 {
                        return self;
                    }
                    let offset = self - origin;
                    let quotient = offset.div_euclid(step);
                    if offset.rem_euclid(step) == 0 {
                        origin + quotient * step
                    } else {
                        origin + (quotient + 1) * step
                    }
                }

                fn ceil_ratio(self, unit: Self) -> usize {
                    if unit <= 0 || self <= 0 {
                        return 1;
                    }
                    let count = (self + unit - 1) / unit;
                    usize::try_from(count).unwrap_or(usize::MAX).max(1)
                }

                fn approx_le(self, other: Self) -> bool {
                    self <= other
                }

                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn read_le(bytes: &[u8]) -> Option<Self> {
                    <[u8; std::mem::size_of::<$t>()]>::try_from(bytes)
                        .ok()
                        .map(<$t>::from_le_bytes)
                }
            }
        )*
    };
}

macro_rules! impl_coord_float {
    ($($t:ty => $elem:expr),* $(,)?) => {
        $(
            impl Coord for $t {
                const ELEMENT: ElementType = $elem;

                fn total_order(&self, other: &Self) -> Ordering {
                    self.total_cmp(other)
                }

                fn snap_down(self, origin: Self, step: Self) -> Self {
                    if !(step > 0.0) {
                        return self;
                    }
                    let steps = ((self - origin) / step) as f64;
                    let nearest = steps.round();
                    let whole = if (steps - nearest).abs() <= SNAP_EPS * nearest.abs().max(1.0) {
                        nearest
                    } else {
                        steps.floor()
                    };
                    origin + (whole as $t) * step
                }

                fn snap_up(self, origin: Self, step: Self) -> Self {
                    if !(step > 0.0) {
                        return self;
                    }
                    let steps = ((self - origin) / step) as f64;
                    let nearest = steps.round();
                    let whole = if (steps - nearest).abs() <= SNAP_EPS * nearest.abs().max(1.0) {
                        nearest
                    } else {
                        steps.ceil()
                    };
                    origin + (whole as $t) * step
                }

                fn ceil_ratio(self, unit: Self) -> usize {
                    if !(unit > 0.0) || !(self > 0.0) {
                        return 1;
                    }
                    let ratio = (self / unit) as f64;
                    let nearest = ratio.round();
                    let count = if (ratio - nearest).abs() <= SNAP_EPS * nearest.max(1.0) {
                        nearest
                    } else {
                        ratio.ceil()
                    };
                    (count as usize).max(1)
                }

                fn approx_le(self, other: Self) -> bool {
                    let slack = (SNAP_EPS as $t) * self.abs().max(other.abs()).max(1.0);
                    self <= other + slack
                }

                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn read_le(bytes: &[u8]) -> Option<Self> {
                    <[u8; std::mem::size_of::<$t>()]>::try_from(bytes)
                        .ok()
                        .map(<$t>::from_le_bytes)
                }
            }
        )*
    };
}

impl_coord_int!(i32 => ElementType::I32, i64 => ElementType::I64);
impl_coord_float!(f32 => ElementType::F32, f64 => ElementType::F64);
