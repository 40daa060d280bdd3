// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

use serde::{Deserialize, Serialize};

use super::Coord;

/// Closed 1D segment `[low, high]`. Empty when `low > high`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval<T> {
    pub low: T,
    pub high: T,
}

impl<T: Coord> Interval<T> {
    pub fn new(low: T, high: T) -> Self {
        Self { low, high }
    }

    /// Component-wise max of the lows and min of the highs.
    /// Disjoint inputs give an empty interval, not an error.
    pub fn intersect(&self, other: &Self) -> Self {
        Self {
            low: self.low.max_of(other.low),
            high: self.high.min_of(other.high),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.low > self.high
    }

    /// Length of the segment, zero for empty intervals.
    pub fn width(&self) -> T {
        if self.is_empty() {
            T::zero()
        } else {
            self.high - self.low
        }
    }

    pub fn contains(&self, x: T) -> bool {
        self.low <= x && x <= self.high
    }

    /// True when `[low, high]` of the argument lies inside this interval.
    pub fn contains_span(&self, low: T, high: T) -> bool {
        self.low <= low && high <= self.high
    }
}

/// Intersect two ascending lists of disjoint intervals, keeping results at least `min_width` wide.
pub fn intersect_sorted<T: Coord>(
    lhs: &[Interval<T>],
    rhs: &[Interval<T>],
    min_width: T,
) -> Vec<Interval<T>> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);

    while i < lhs.len() && j < rhs.len() {
        let common = lhs[i].intersect(&rhs[j]);
        if !common.is_empty() && min_width.approx_le(common.width()) {
            out.push(common);
        }
        // Advance whichever interval ends first
        if lhs[i].high < rhs[j].high {
            i += 1;
        } else {
            j += 1;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersect_sorted_sweep() {
        let a = vec![Interval::new(0i64, 10), Interval::new(20, 40)];
        let b = vec![Interval::new(5i64, 25), Interval::new(30, 35)];
        let out = intersect_sorted(&a, &b, 0);
        assert_eq!(
            out,
            vec![
                Interval::new(5, 10),
                Interval::new(20, 25),
                Interval::new(30, 35)
            ]
        );

        let wide = intersect_sorted(&a, &b, 6);
        assert!(wide.is_empty());
    }
}
