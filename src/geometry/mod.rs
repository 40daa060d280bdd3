// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Interval algebra and free-space rectangles

pub mod blank;
pub mod coord;
pub mod interval;

pub use blank::{Blank, Obstacle};
pub use coord::Coord;
pub use interval::{intersect_sorted, Interval};
