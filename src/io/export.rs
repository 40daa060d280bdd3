// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

use std::fs::File;
use std::io::Write;

use csv::Writer;
use serde::Serialize;

use crate::error::Result;
use crate::geometry::Coord;
use crate::legalize::{CellPlacement, FailureReason, PlacementStatus};

#[derive(Debug, Serialize)]
pub struct PlacementCsvRecord<T> {
    pub id: usize,
    pub status: PlacementStatus,
    pub row: Option<usize>,
    pub x: Option<T>,
    pub y: Option<T>,
    pub displacement: Option<T>,
    pub reason: String,
}

/// Describe why a cell failed, empty for assigned cells
fn format_reason(failure: &Option<FailureReason>) -> String {
    match failure {
        None => String::new(),
        Some(FailureReason::Infeasible) => "infeasible".to_string(),
        Some(FailureReason::InvalidGeometry(message)) => format!("invalid geometry: {message}"),
    }
}

fn placement_to_csv_record<T: Coord>(placement: &CellPlacement<T>) -> PlacementCsvRecord<T> {
    PlacementCsvRecord {
        id: placement.id,
        status: placement.status,
        row: placement.assigned_row,
        x: placement.assigned_x,
        y: placement.assigned_y,
        displacement: placement.displacement,
        reason: format_reason(&placement.failure),
    }
}

/// Write one CSV record per placement to `writer`
pub fn write_placements<T, W>(placements: &[CellPlacement<T>], writer: W) -> Result<()>
where
    T: Coord + Serialize,
    W: Write,
{
    let mut writer = Writer::from_writer(writer);
    for placement in placements {
        writer.serialize(placement_to_csv_record(placement))?;
    }
    writer.flush()?;
    Ok(())
}

/// Export placements to a CSV file
pub fn export_placements_to_csv<T: Coord + Serialize>(
    placements: &[CellPlacement<T>],
    file_path: &str,
) -> Result<()> {
    let file = File::create(file_path)?;
    write_placements(placements, file)
}
