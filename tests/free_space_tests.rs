// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

use row_legalizer::geometry::{Interval, Obstacle};
use row_legalizer::legalize::free_space::FreeSpaceIndex;
use row_legalizer::legalize::macro_span::MacroSpanResolver;
use row_legalizer::legalize::{IssueSource, RowSpec};

fn row(yl: i64, yh: i64, xl: i64, xh: i64) -> RowSpec<i64> {
    RowSpec {
        yl,
        yh,
        site_width: 1,
        xl_bound: xl,
        xh_bound: xh,
    }
}

fn stacked_rows(count: usize) -> Vec<RowSpec<i64>> {
    (0..count as i64).map(|i| row(i * 10, i * 10 + 10, 0, 100)).collect()
}

fn blank_spans(index: &FreeSpaceIndex<i64>, r: usize) -> Vec<(i64, i64)> {
    index.rows()[r].blanks().iter().map(|b| (b.xl, b.xh)).collect()
}

#[test]
fn test_obstacles_carve_blanks() {
    let obstacles = vec![
        Obstacle::new(20, 0, 30, 10),
        // Overlaps the first one, merged into [20, 35]
        Obstacle::new(25, 5, 35, 15),
        // Sticks out past the right bound
        Obstacle::new(90, 0, 120, 10),
    ];
    let index = FreeSpaceIndex::new(&stacked_rows(2), &obstacles);

    assert!(index.issues().is_empty());
    assert_eq!(blank_spans(&index, 0), vec![(0, 20), (35, 90)]);
    assert_eq!(blank_spans(&index, 1), vec![(0, 25), (35, 100)]);
    assert_eq!(index.rows()[0].obstacle_width(), 25);
    assert_eq!(index.rows()[1].obstacle_width(), 10);
}

#[test]
fn test_query_clips_to_window_and_filters_width() {
    let obstacles = vec![Obstacle::new(40, 0, 50, 10)];
    let index = FreeSpaceIndex::new(&stacked_rows(1), &obstacles);

    let slots = index.query(0, 30, 70, 5);
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0].blank, 0);
    assert_eq!(slots[0].span, Interval::new(30, 40));
    assert_eq!(slots[1].blank, 1);
    assert_eq!(slots[1].span, Interval::new(50, 70));

    let wide = index.query(0, 30, 70, 15);
    assert_eq!(wide.len(), 1);
    assert_eq!(wide[0].blank, 1);

    assert!(index.query(0, 41, 49, 0).is_empty());
    assert!(index.query(7, 0, 100, 0).is_empty());
}

#[test]
fn test_consume_splits_blank() {
    let mut index = FreeSpaceIndex::new(&stacked_rows(1), &[]);

    index.consume(0, 0, 40, 10).unwrap();
    assert_eq!(blank_spans(&index, 0), vec![(0, 40), (50, 100)]);

    // Flush against the left edge leaves a single remainder
    index.consume(0, 1, 50, 10).unwrap();
    assert_eq!(blank_spans(&index, 0), vec![(0, 40), (60, 100)]);

    // Exact fit removes the blank
    index.consume(0, 0, 0, 40).unwrap();
    assert_eq!(blank_spans(&index, 0), vec![(60, 100)]);

    assert_eq!(index.rows()[0].assigned_width(), 60);
    assert_eq!(index.rows()[0].free_width(), 40);
    index.rows()[0].check_invariants().unwrap();
}

#[test]
fn test_consume_rejects_out_of_blank_assignment() {
    let mut index = FreeSpaceIndex::new(&stacked_rows(1), &[Obstacle::new(40, 0, 50, 10)]);

    let err = index.consume(0, 0, 35, 10).unwrap_err();
    assert!(err.is_geometry());
    let err = index.consume(0, 5, 0, 10).unwrap_err();
    assert!(err.is_geometry());
    let err = index.consume(0, 0, 0, 0).unwrap_err();
    assert!(err.is_geometry());
    let err = index.consume(3, 0, 0, 10).unwrap_err();
    assert!(err.is_geometry());

    // Nothing changed
    assert_eq!(blank_spans(&index, 0), vec![(0, 40), (50, 100)]);
    assert_eq!(index.rows()[0].assigned_width(), 0);
}

#[test]
fn test_locate_and_blank_at() {
    let index = FreeSpaceIndex::new(&stacked_rows(1), &[Obstacle::new(40, 0, 50, 10)]);
    let r = &index.rows()[0];

    assert_eq!(r.blank_at(0), Some(0));
    assert_eq!(r.blank_at(40), Some(0));
    assert_eq!(r.blank_at(45), None);
    assert_eq!(r.blank_at(60), Some(1));

    assert_eq!(index.locate(0, 30, 10), Some(0));
    assert_eq!(index.locate(0, 35, 10), None);
    assert_eq!(index.locate(0, 50, 50), Some(1));
    assert_eq!(index.locate(0, 55, 50), None);
}

#[test]
fn test_malformed_rows_are_disabled_not_fatal() {
    let rows = vec![
        row(0, 10, 0, 100),
        // Inverted x-bounds
        row(10, 20, 100, 0),
        RowSpec {
            site_width: 0,
            ..row(20, 30, 0, 100)
        },
        row(30, 40, 0, 100),
        // Overlaps the previous row
        row(35, 45, 0, 100),
    ];
    let obstacles = vec![Obstacle::new(50, 0, 10, 10)];
    let mut index = FreeSpaceIndex::new(&rows, &obstacles);

    assert_eq!(index.len(), 5);
    assert_eq!(index.usable_rows(), 2);
    let sources: Vec<IssueSource> = index.issues().iter().map(|i| i.source).collect();
    assert_eq!(
        sources,
        vec![
            IssueSource::Obstacle(0),
            IssueSource::Row(1),
            IssueSource::Row(2),
            IssueSource::Row(4),
        ]
    );
    assert!(index.issues().iter().all(|i| i.error.is_geometry()));

    assert!(!index.rows()[1].is_enabled());
    assert!(index.rows()[1].blanks().is_empty());
    assert_eq!(blank_spans(&index, 3), vec![(0, 100)]);
    assert!(index.consume(1, 0, 0, 10).is_err());
}

#[test]
fn test_row_at_y_prefers_containing_then_nearest() {
    let rows = vec![row(0, 10, 0, 100), row(10, 20, 0, 100), row(40, 50, 0, 100)];
    let index = FreeSpaceIndex::new(&rows, &[]);

    assert_eq!(index.row_at_y(-30), Some(0));
    assert_eq!(index.row_at_y(0), Some(0));
    assert_eq!(index.row_at_y(10), Some(1));
    assert_eq!(index.row_at_y(19), Some(1));
    assert_eq!(index.row_at_y(25), Some(1));
    // Equidistant gap resolves downward
    assert_eq!(index.row_at_y(30), Some(1));
    assert_eq!(index.row_at_y(31), Some(2));
    assert_eq!(index.row_at_y(500), Some(2));

    let empty = FreeSpaceIndex::<i64>::new(&[], &[]);
    assert_eq!(empty.row_at_y(0), None);
}

#[test]
fn test_band_requires_contiguous_usable_rows() {
    let rows = vec![
        row(0, 10, 0, 100),
        row(10, 20, 0, 100),
        row(20, 30, 0, 100),
        row(40, 50, 0, 100),
    ];
    let index = FreeSpaceIndex::new(&rows, &[]);

    assert_eq!(index.band(0, 3), Some(0..3));
    assert_eq!(index.band(1, 2), Some(1..3));
    assert_eq!(index.band(2, 2), None);
    assert_eq!(index.band(3, 2), None);
    assert_eq!(index.band(0, 0), None);
}

#[test]
fn test_extent_and_widest_row() {
    let rows = vec![row(0, 10, 10, 60), row(10, 20, 0, 40), row(20, 30, 100, 0)];
    let index = FreeSpaceIndex::new(&rows, &[]);

    assert_eq!(index.widest_row(), Some(50));
    assert_eq!(index.x_extent(), Some(Interval::new(0, 60)));
}

#[test]
fn test_macro_span_resolver_intersects_band() {
    let obstacles = vec![Obstacle::new(0, 10, 30, 20), Obstacle::new(45, 10, 100, 20)];
    let index = FreeSpaceIndex::new(&stacked_rows(3), &obstacles);
    let resolver = MacroSpanResolver::new(&index);

    assert_eq!(resolver.resolve_at(0..3, 35, 10), Some(Interval::new(30, 45)));
    assert_eq!(resolver.resolve_at(0..3, 35, 20), None);
    assert_eq!(resolver.resolve_at(0..3, 10, 1), None);
    assert_eq!(resolver.resolve_at(0..1, 10, 20), Some(Interval::new(0, 100)));

    let spans = resolver.common_spans(0..3, Interval::new(0, 100), 10);
    assert_eq!(spans, vec![Interval::new(30, 45)]);
    assert!(resolver.common_spans(0..3, Interval::new(0, 100), 16).is_empty());
    assert!(resolver.common_spans(0..0, Interval::new(0, 100), 1).is_empty());
}
