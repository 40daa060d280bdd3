// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use log::{debug, info};
use serde::de::DeserializeOwned;

use super::def_rows::{parse_def_rows, DefRowLayout};
use crate::error::{LegalizeError, Result};
use crate::geometry::{Coord, Obstacle};
use crate::legalize::{Cell, RowSpec};

/// Reads design tables from CSV files (`id,width,height,x,y[,priority]`,
/// `yl,yh,site_width,xl,xh` and `xl,yl,xh,yh`) or rows from DEF `ROW` statements.
pub struct DesignReader;

impl DesignReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read_cells<T, P>(&self, path: P) -> Result<Vec<Cell<T>>>
    where
        T: Coord + DeserializeOwned,
        P: AsRef<Path>,
    {
        info!("[LOAD] Loading cells: {}", path.as_ref().display());
        let cells = self.cells_from_reader(File::open(path)?)?;
        info!("[INFO] Cells: {}", cells.len());
        Ok(cells)
    }

    pub fn read_rows<T, P>(&self, path: P) -> Result<Vec<RowSpec<T>>>
    where
        T: Coord + DeserializeOwned,
        P: AsRef<Path>,
    {
        info!("[LOAD] Loading rows: {}", path.as_ref().display());
        let rows = self.rows_from_reader(File::open(path)?)?;
        info!("[INFO] Rows: {}", rows.len());
        Ok(rows)
    }

    pub fn read_obstacles<T, P>(&self, path: P) -> Result<Vec<Obstacle<T>>>
    where
        T: Coord + DeserializeOwned,
        P: AsRef<Path>,
    {
        info!("[LOAD] Loading obstacles: {}", path.as_ref().display());
        let obstacles = self.obstacles_from_reader(File::open(path)?)?;
        info!("[INFO] Obstacles: {}", obstacles.len());
        Ok(obstacles)
    }

    /// Rows from the `ROW` statements of a DEF file, each `row_height` tall.
    /// `site_width` is used for rows without a `STEP` clause. Gaps between statements on
    /// the same row come back as obstacles.
    pub fn read_def_rows<T, P>(&self, path: P, row_height: T, site_width: T) -> Result<DefRowLayout<T>>
    where
        T: Coord,
        P: AsRef<Path>,
    {
        let path_str = path.as_ref().display().to_string();
        info!("[LOAD] Loading DEF rows: {path_str}");

        let content = fs::read_to_string(path)?;
        debug!("[FILE] DEF file size: {} bytes", content.len());

        let section = parse_def_rows(&content)?;
        let layout = section.row_specs(row_height, site_width)?;
        info!(
            "[INFO] DEF rows: {} statements, {} placement rows, {} gaps",
            section.rows.len(),
            layout.rows.len(),
            layout.gaps.len()
        );
        Ok(layout)
    }

    pub fn cells_from_reader<T, R>(&self, reader: R) -> Result<Vec<Cell<T>>>
    where
        T: Coord + DeserializeOwned,
        R: Read,
    {
        deserialize_all(reader)
    }

    pub fn rows_from_reader<T, R>(&self, reader: R) -> Result<Vec<RowSpec<T>>>
    where
        T: Coord + DeserializeOwned,
        R: Read,
    {
        deserialize_all(reader)
    }

    pub fn obstacles_from_reader<T, R>(&self, reader: R) -> Result<Vec<Obstacle<T>>>
    where
        T: Coord + DeserializeOwned,
        R: Read,
    {
        deserialize_all(reader)
    }
}

impl Default for DesignReader {
    fn default() -> Self {
        Self::new()
    }
}

fn deserialize_all<D: DeserializeOwned, R: Read>(reader: R) -> Result<Vec<D>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);
    csv_reader
        .deserialize()
        .map(|record| record.map_err(LegalizeError::from))
        .collect()
}
