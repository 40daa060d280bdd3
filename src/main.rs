// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

use std::path::PathBuf;

use clap::Parser;
use log::info;

use row_legalizer::io::{export_placements_to_csv, DesignReader};
use row_legalizer::legalize::OrderingStrategy;
use row_legalizer::{backend_from_config, Coord, LegalizerConfig, Legalizer};

#[cfg(feature = "integer-coords")]
type CoordT = i64;
#[cfg(not(feature = "integer-coords"))]
type CoordT = f64;

#[derive(Parser, Debug)]
#[command(name = "row-legalizer")]
#[command(about = "Legalize a global placement onto placement rows", long_about = None)]
struct Args {
    /// Cells CSV: id,width,height,x,y[,priority]
    #[arg(long)]
    cells: PathBuf,

    /// Rows CSV: yl,yh,site_width,xl,xh
    #[arg(long, conflicts_with = "def")]
    rows: Option<PathBuf>,

    /// DEF file whose ROW statements define the placement rows
    #[arg(long, requires = "row_height")]
    def: Option<PathBuf>,

    /// Height of each DEF row
    #[arg(long)]
    row_height: Option<f64>,

    /// Site width for DEF rows without a STEP clause
    #[arg(long, default_value_t = 1.0)]
    site_width: f64,

    /// Obstacles CSV: xl,yl,xh,yh
    #[arg(long)]
    obstacles: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Cell ordering: target_x, row_major, size or priority
    #[arg(long)]
    ordering: Option<OrderingStrategy>,

    /// Evaluate candidate rows in parallel
    #[arg(long)]
    parallel: bool,

    /// Output CSV for the placements
    #[arg(short, long, default_value = "placement.csv")]
    output: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => LegalizerConfig::load(path)?,
        None => LegalizerConfig::default(),
    };
    if let Some(ordering) = args.ordering {
        config.ordering = ordering;
    }
    if args.parallel {
        config.parallel = true;
    }

    let reader = DesignReader::new();
    let cells = reader.read_cells::<CoordT, _>(&args.cells)?;
    let mut obstacles = match &args.obstacles {
        Some(path) => reader.read_obstacles::<CoordT, _>(path)?,
        None => Vec::new(),
    };
    let rows = match (&args.rows, &args.def) {
        (Some(path), _) => reader.read_rows::<CoordT, _>(path)?,
        (None, Some(path)) => {
            let row_height = args.row_height.ok_or("--def needs --row-height")?;
            let row_height = CoordT::from_f64_rounded(row_height).ok_or("--row-height is out of range")?;
            let site_width = CoordT::from_f64_rounded(args.site_width).ok_or("--site-width is out of range")?;
            let layout = reader.read_def_rows(path, row_height, site_width)?;
            obstacles.extend(layout.gaps);
            layout.rows
        }
        (None, None) => return Err("either --rows or --def is required".into()),
    };

    let mut backend = backend_from_config(&config.backend);
    let legalizer = Legalizer::new(config)?;
    let result = legalizer.run(&cells, &rows, &obstacles, backend.as_mut())?;

    let output = args.output.display().to_string();
    export_placements_to_csv(&result.placements, &output)?;
    info!("[SAVE] Placements written to {output}");

    let stats = &result.stats;
    println!(
        "{} assigned, {} failed ({} invalid), {} movable macros",
        stats.assigned, stats.failed, stats.invalid, stats.movable_macros
    );
    println!(
        "displacement: total {:.3}, max {:.3}",
        stats.total_displacement, stats.max_displacement
    );
    if !result.issues.is_empty() {
        println!("{} geometry issues in the input", result.issues.len());
    }

    Ok(())
}
