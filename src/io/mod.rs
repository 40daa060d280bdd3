// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Design input and placement report output

pub mod def_rows;
pub mod export;
pub mod reader;

pub use def_rows::{parse_def_rows, DefRow, DefRowLayout, DefRowSection};
pub use export::{export_placements_to_csv, write_placements, PlacementCsvRecord};
pub use reader::DesignReader;
