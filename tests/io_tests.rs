// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

use std::fs;
use std::io::Write;

use row_legalizer::geometry::Obstacle;
use row_legalizer::io::{export_placements_to_csv, parse_def_rows, write_placements, DesignReader};
use row_legalizer::legalize::{FreeSpaceIndex, Legalizer, RowSpec};
use row_legalizer::{Cell, LegalizeError, LegalizerConfig};
use tempfile::{tempdir, NamedTempFile};

const GCD_DEF: &str = "VERSION 5.8 ;
DESIGN gcd ;
UNITS DISTANCE MICRONS 1000 ;
# Core area
DIEAREA ( 0 0 ) ( 2000 3000 ) ;
ROW ROW_0 unithd 100 200 N DO 180 BY 1 STEP 10 0 ;
ROW ROW_1 unithd 100 470 FS DO 180 BY 1 STEP 10 0 ;
COMPONENTS 1 ;
- u1 INV + PLACED ( 0 0 ) N ;
END COMPONENTS
END DESIGN
";

#[test]
fn test_read_cells_with_optional_priority() {
    let reader = DesignReader::new();
    let plain = "id,width,height,x,y\n0, 10, 10, 40.5, 0\n# skipped\n1,20,10,3,10\n";
    let cells: Vec<Cell<f64>> = reader.cells_from_reader(plain.as_bytes()).unwrap();
    assert_eq!(cells.len(), 2);
    assert_eq!(cells[0], Cell::new(0, 10.0, 10.0, 40.5, 0.0));
    assert_eq!(cells[1].priority, 0);

    let ranked = "id,width,height,x,y,priority\n4,2,2,1,1,7\n";
    let cells: Vec<Cell<i64>> = reader.cells_from_reader(ranked.as_bytes()).unwrap();
    assert_eq!(cells[0], Cell::new(4, 2, 2, 1, 1).with_priority(7));
}

#[test]
fn test_read_rows_and_obstacles() {
    let reader = DesignReader::new();
    let rows: Vec<RowSpec<i64>> = reader
        .rows_from_reader("yl,yh,site_width,xl,xh\n0,10,2,0,100\n10,20,2,4,96\n".as_bytes())
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].xl_bound, 4);
    assert_eq!(rows[1].xh_bound, 96);

    let obstacles: Vec<Obstacle<i64>> = reader
        .obstacles_from_reader("xl,yl,xh,yh\n30,0,40,20\n".as_bytes())
        .unwrap();
    assert_eq!(obstacles, vec![Obstacle::new(30, 0, 40, 20)]);
}

#[test]
fn test_malformed_csv_is_an_error() {
    let reader = DesignReader::new();
    let result: Result<Vec<Cell<i64>>, _> =
        reader.cells_from_reader("id,width,height,x,y\n0,wide,10,0,0\n".as_bytes());
    assert!(matches!(result, Err(LegalizeError::Csv(_))));

    let missing = reader.read_cells::<f64, _>("/nonexistent/cells.csv");
    assert!(matches!(missing, Err(LegalizeError::Io(_))));
}

#[test]
fn test_read_design_files() {
    let dir = tempdir().unwrap();
    let cells_path = dir.path().join("cells.csv");
    let rows_path = dir.path().join("rows.csv");
    fs::write(&cells_path, "id,width,height,x,y\n0,10,10,12,3\n1,10,10,14,4\n").unwrap();
    fs::write(&rows_path, "yl,yh,site_width,xl,xh\n0,10,1,0,100\n").unwrap();

    let reader = DesignReader::new();
    let cells = reader.read_cells::<i64, _>(&cells_path).unwrap();
    let rows = reader.read_rows::<i64, _>(&rows_path).unwrap();

    let legalizer = Legalizer::new(LegalizerConfig::default()).unwrap();
    let mut index = FreeSpaceIndex::new(&rows, &[]);
    let result = legalizer.run_with_index(&cells, &mut index);
    assert_eq!(result.stats.assigned, 2);
    assert_eq!(result.placement(0).unwrap().assigned_x, Some(12));
    assert_eq!(result.placement(1).unwrap().assigned_x, Some(22));
}

#[test]
fn test_def_rows_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(GCD_DEF.as_bytes()).unwrap();

    let layout = DesignReader::new()
        .read_def_rows(file.path(), 270.0f64, 1.0)
        .unwrap();
    assert!(layout.gaps.is_empty());
    let rows = layout.rows;
    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows[0],
        RowSpec {
            yl: 200.0,
            yh: 470.0,
            site_width: 10.0,
            xl_bound: 100.0,
            xh_bound: 1900.0,
        }
    );
    assert_eq!(rows[1].yl, 470.0);
    assert_eq!(rows[1].yh, 740.0);
}

#[test]
fn test_def_rows_clip_to_die_and_expand_columns() {
    let content = "DIEAREA ( 0 0 ) ( 500 2000 ) ;
ROW wide core 0 0 N DO 100 BY 1 STEP 10 0 ;
ROW tall core 600 0 N DO 1 BY 2 STEP 0 100 ;
";
    let section = parse_def_rows(content).unwrap();
    assert_eq!(section.die_bounds(), Some((0.0, 0.0, 500.0, 2000.0)));
    assert_eq!(section.rows.len(), 2);

    let rows = section.row_specs(100i64, 5).unwrap().rows;
    // The clipped-away column at y 0 folds into the wide row
    assert_eq!(rows.len(), 2);
    assert_eq!((rows[0].yl, rows[0].xl_bound, rows[0].xh_bound), (0, 0, 500));
    // Rows without a STEP x-pitch take the given site width; this one lies outside the die
    assert_eq!(rows[1].site_width, 5);
    assert_eq!(rows[1].xl_bound, 600);
    assert_eq!(rows[1].yl, 100);
    assert_eq!(rows[1].yh, 200);

    assert!(matches!(
        section.row_specs(0i64, 5),
        Err(LegalizeError::Config(_))
    ));
}

#[test]
fn test_def_rows_split_around_a_macro_share_one_row() {
    let content = "DIEAREA ( 0 0 ) ( 1000 200 ) ;
ROW core_0_left core 0 0 N DO 30 BY 1 STEP 10 0 ;
ROW core_0_right core 600 0 N DO 40 BY 1 STEP 10 0 ;
ROW core_1 core 0 100 FS DO 100 BY 1 STEP 10 0 ;
";
    let layout = parse_def_rows(content).unwrap().row_specs(100i64, 10).unwrap();
    assert_eq!(layout.rows.len(), 2);
    assert_eq!((layout.rows[0].xl_bound, layout.rows[0].xh_bound), (0, 1000));
    assert_eq!(layout.gaps, vec![Obstacle::new(300, 0, 600, 100)]);

    let index = FreeSpaceIndex::new(&layout.rows, &layout.gaps);
    assert!(index.issues().is_empty());
    assert_eq!(index.usable_rows(), 2);
    assert_eq!(index.row(0).unwrap().free_width(), 700);

    // A cell aimed at the right fragment lands there instead of being lost with the row
    let cells = vec![Cell::new(0, 50, 100, 800, 0), Cell::new(1, 50, 100, 320, 0)];
    let legalizer = Legalizer::new(LegalizerConfig::default()).unwrap();
    let mut index = FreeSpaceIndex::new(&layout.rows, &layout.gaps);
    let result = legalizer.run_with_index(&cells, &mut index);
    assert_eq!(result.stats.assigned, 2);
    let right = result.placement(0).unwrap();
    assert_eq!((right.assigned_row, right.assigned_x), (Some(0), Some(800)));
    let blocked = result.placement(1).unwrap();
    assert_eq!((blocked.assigned_row, blocked.assigned_x), (Some(0), Some(250)));
}

#[test]
fn test_bad_def_row_reports_line() {
    let err = parse_def_rows("VERSION 5.8 ;\nROW broken ;\n").unwrap_err();
    match err {
        LegalizeError::Parse(message) => assert!(message.starts_with("line 2")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_export_placements() {
    let rows = vec![RowSpec {
        yl: 0i64,
        yh: 10,
        site_width: 1,
        xl_bound: 0,
        xh_bound: 100,
    }];
    let cells = vec![Cell::new(0, 10, 10, 40, 0), Cell::new(1, 150, 10, 0, 0)];
    let legalizer = Legalizer::new(LegalizerConfig::default()).unwrap();
    let mut index = FreeSpaceIndex::new(&rows, &[]);
    let result = legalizer.run_with_index(&cells, &mut index);

    let mut buffer = Vec::new();
    write_placements(&result.placements, &mut buffer).unwrap();
    let text = String::from_utf8(buffer).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "id,status,row,x,y,displacement,reason");
    assert_eq!(lines[1], "0,assigned,0,40,0,0,");
    assert!(lines[2].starts_with("1,failed,,,,,invalid geometry"));

    let dir = tempdir().unwrap();
    let path = dir.path().join("placement.csv");
    let path = path.to_str().unwrap();
    export_placements_to_csv(&result.placements, path).unwrap();
    assert_eq!(fs::read_to_string(path).unwrap(), text);
}
