// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! DEF `ROW` and `DIEAREA` statements
//!
//! Only the statements that describe placement rows are read; every other
//! DEF section is skipped. Statements are split on `;` after removing `#`
//! comments, then each `ROW`/`DIEAREA` statement is parsed with nom.

use itertools::Itertools;
use log::{debug, warn};
use nom::{
    bytes::complete::{tag, take_while1},
    character::complete::{digit1, multispace0, multispace1},
    combinator::{map_res, opt},
    multi::many1,
    number::complete::double,
    sequence::{delimited, preceded},
    IResult, Parser,
};
use num_traits::NumCast;
use serde::{Deserialize, Serialize};

use crate::error::{LegalizeError, Result};
use crate::geometry::{Coord, Obstacle};
use crate::legalize::RowSpec;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefRow {
    pub name: String,
    pub site_name: String,
    pub x: f64,
    pub y: f64,
    pub orient: String,
    pub num_x: i32,
    pub num_y: i32,
    pub step_x: f64,
    pub step_y: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefRowSection {
    pub die_area_points: Vec<(f64, f64)>,
    pub rows: Vec<DefRow>,
}

/// Placement rows expanded from DEF `ROW` statements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefRowLayout<T> {
    /// One row per y-range, bottom-up.
    pub rows: Vec<RowSpec<T>>,
    /// Parts of a merged row that none of its statements covers.
    pub gaps: Vec<Obstacle<T>>,
}

impl DefRowSection {
    /// Bounding box of the die area as `(xl, yl, xh, yh)`.
    pub fn die_bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let (first, rest) = self.die_area_points.split_first()?;
        Some(rest.iter().fold(
            (first.0, first.1, first.0, first.1),
            |(xl, yl, xh, yh), &(x, y)| (xl.min(x), yl.min(y), xh.max(x), yh.max(y)),
        ))
    }

    /// Expand every statement into placement rows of height `row_height`, clipped to the die
    /// area when one is present and sorted bottom-up. Statements that share a y-range become
    /// one row; the x-ranges none of them covers are returned as gaps.
    pub fn row_specs<T: Coord>(&self, row_height: T, site_width: T) -> Result<DefRowLayout<T>> {
        if !(row_height > T::zero()) {
            return Err(LegalizeError::Config(format!(
                "row height must be positive, got {row_height}"
            )));
        }
        let die = self.die_bounds();
        let mut specs = Vec::new();

        for row in &self.rows {
            let coord = |value: f64| {
                T::from_f64_rounded(value).ok_or_else(|| {
                    LegalizeError::Parse(format!("row {}: coordinate {value} is out of range", row.name))
                })
            };
            let site = if row.step_x > 0.0 {
                coord(row.step_x)?
            } else {
                site_width
            };
            let num_x = row.num_x.max(1);
            let columns = <T as NumCast>::from(num_x)
                .ok_or_else(|| LegalizeError::Parse(format!("row {}: {num_x} columns", row.name)))?;
            for j in 0..row.num_y.max(1) {
                let y = coord(row.y + <f64 as From<i32>>::from(j) * row.step_y)?;
                let mut xl = coord(row.x)?;
                let mut xh = xl + site * columns;
                if let Some((die_xl, _, die_xh, _)) = die {
                    xl = xl.max_of(coord(die_xl)?);
                    xh = xh.min_of(coord(die_xh)?);
                }
                specs.push(RowSpec {
                    yl: y,
                    yh: y + row_height,
                    site_width: site,
                    xl_bound: xl,
                    xh_bound: xh,
                });
            }
        }

        specs.sort_by(|a, b| a.yl.total_order(&b.yl).then_with(|| a.xl_bound.total_order(&b.xl_bound)));
        Ok(merge_fragments(specs))
    }
}

/// Fold fragments sorted by `(yl, xl)` into one row per y-range.
fn merge_fragments<T: Coord>(specs: Vec<RowSpec<T>>) -> DefRowLayout<T> {
    let mut layout = DefRowLayout {
        rows: Vec::with_capacity(specs.len()),
        gaps: Vec::new(),
    };
    let groups = specs.into_iter().chunk_by(|spec| (spec.yl, spec.yh));

    for (_, group) in &groups {
        let (usable, degenerate): (Vec<_>, Vec<_>) =
            group.partition(|spec| spec.xl_bound < spec.xh_bound);
        let Some((first, rest)) = usable.split_first() else {
            // Left for the free-space index to report
            layout.rows.extend(degenerate);
            continue;
        };
        if !degenerate.is_empty() {
            debug!(
                "[MERGE] dropping {} empty row fragments at y {}",
                degenerate.len(),
                first.yl
            );
        }

        let mut merged = *first;
        for next in rest {
            if next.xl_bound > merged.xh_bound {
                layout.gaps.push(Obstacle::new(merged.xh_bound, merged.yl, next.xl_bound, merged.yh));
            }
            merged.xh_bound = merged.xh_bound.max_of(next.xh_bound);
        }
        if !rest.is_empty() {
            debug!(
                "[MERGE] {} row fragments at y {} span [{}, {}]",
                usable.len(),
                merged.yl,
                merged.xl_bound,
                merged.xh_bound
            );
        }
        layout.rows.push(merged);
    }

    layout
}

fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '.' || c == '/' || c == '-')(
        input,
    )
}

fn integer(input: &str) -> IResult<&str, i32> {
    map_res(digit1, str::parse::<i32>).parse(input)
}

fn point(input: &str) -> IResult<&str, (f64, f64)> {
    delimited(
        (tag("("), multispace0),
        (double, preceded(multispace1, double)),
        (multispace0, tag(")")),
    )
    .parse(input)
}

/// `DIEAREA ( x y ) ( x y ) ...` without the trailing semicolon.
fn parse_die_area(input: &str) -> IResult<&str, Vec<(f64, f64)>> {
    let (input, _) = multispace0(input)?;
    let (input, _) = tag("DIEAREA")(input)?;
    let (input, points) = many1(preceded(multispace0, point)).parse(input)?;
    let (input, _) = multispace0(input)?;
    Ok((input, points))
}

/// `STEP sx sy`
fn parse_step(input: &str) -> IResult<&str, (f64, f64)> {
    let (input, _) = tag("STEP")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, step_x) = double(input)?;
    let (input, _) = multispace1(input)?;
    let (input, step_y) = double(input)?;
    let (input, _) = multispace0(input)?;
    Ok((input, (step_x, step_y)))
}

/// `DO nx BY ny [STEP sx sy]`
fn parse_repeat(input: &str) -> IResult<&str, (i32, i32, Option<(f64, f64)>)> {
    let (input, _) = tag("DO")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, num_x) = integer(input)?;
    let (input, _) = multispace1(input)?;
    let (input, _) = tag("BY")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, num_y) = integer(input)?;
    let (input, _) = multispace0(input)?;
    let (input, step) = opt(parse_step).parse(input)?;
    Ok((input, (num_x, num_y, step)))
}

/// `ROW name site x y orient [DO nx BY ny [STEP sx sy]]` without the trailing semicolon.
fn parse_row(input: &str) -> IResult<&str, DefRow> {
    let (input, _) = multispace0(input)?;
    let (input, _) = tag("ROW")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, name) = identifier(input)?;
    let (input, _) = multispace1(input)?;
    let (input, site_name) = identifier(input)?;
    let (input, _) = multispace1(input)?;
    let (input, x) = double(input)?;
    let (input, _) = multispace1(input)?;
    let (input, y) = double(input)?;
    let (input, _) = multispace1(input)?;
    let (input, orient) = identifier(input)?;
    let (input, _) = multispace0(input)?;
    let (input, repeat) = opt(parse_repeat).parse(input)?;
    let (input, _) = multispace0(input)?;

    let (num_x, num_y, step) = repeat.unwrap_or((1, 1, None));
    let (step_x, step_y) = step.unwrap_or((0.0, 0.0));

    Ok((
        input,
        DefRow {
            name: name.to_string(),
            site_name: site_name.to_string(),
            x,
            y,
            orient: orient.to_string(),
            num_x,
            num_y,
            step_x,
            step_y,
        },
    ))
}

/// Statements with their starting line (1-based), comments removed.
fn statements(content: &str) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut start_line = 1;

    for (i, raw) in content.lines().enumerate() {
        let line = match raw.find('#') {
            Some(pos) => &raw[..pos],
            None => raw,
        };
        for (k, piece) in line.split(';').enumerate() {
            if k > 0 {
                // A semicolon closed the statement in progress
                if !current.trim().is_empty() {
                    out.push((start_line, current.trim().to_string()));
                }
                current.clear();
            }
            if current.trim().is_empty() && !piece.trim().is_empty() {
                start_line = i + 1;
            }
            current.push_str(piece);
            current.push(' ');
        }
    }

    out
}

/// Read the `DIEAREA` and every `ROW` statement of a DEF file.
pub fn parse_def_rows(content: &str) -> Result<DefRowSection> {
    let mut section = DefRowSection::default();

    for (line, statement) in statements(content) {
        let keyword = statement.split_whitespace().next().unwrap_or_default();
        match keyword {
            "ROW" => {
                let (rest, row) = parse_row(&statement)
                    .map_err(|e| LegalizeError::Parse(format!("line {line}: bad ROW statement: {e:?}")))?;
                if !rest.trim().is_empty() {
                    warn!("[WARN] line {line}: ignoring trailing ROW content '{}'", rest.trim());
                }
                debug!("[ROW] {} at ({}, {}) x{}", row.name, row.x, row.y, row.num_x);
                section.rows.push(row);
            }
            "DIEAREA" => {
                let (_, points) = parse_die_area(&statement)
                    .map_err(|e| LegalizeError::Parse(format!("line {line}: bad DIEAREA statement: {e:?}")))?;
                section.die_area_points = points;
            }
            _ => {}
        }
    }

    Ok(section)
}
