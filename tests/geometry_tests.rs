// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

use row_legalizer::geometry::{intersect_sorted, Blank, Coord, Interval, Obstacle};

#[test]
fn test_interval_intersect_overlapping() {
    let a = Interval::new(0i64, 50);
    let b = Interval::new(30, 80);
    let common = a.intersect(&b);
    assert_eq!(common, Interval::new(30, 50));
    assert_eq!(common.width(), 20);
    assert!(!common.is_empty());
}

#[test]
fn test_interval_intersect_disjoint_is_empty() {
    let a = Interval::new(0.0f64, 10.0);
    let b = Interval::new(20.0, 30.0);
    let common = a.intersect(&b);
    assert!(common.is_empty());
    assert_eq!(common.width(), 0.0);
}

#[test]
fn test_interval_touching_gives_zero_width() {
    let common = Interval::new(0i32, 10).intersect(&Interval::new(10, 20));
    assert!(!common.is_empty());
    assert_eq!(common.width(), 0);
    assert!(common.contains(10));
}

#[test]
fn test_interval_contains_span() {
    let iv = Interval::new(10i64, 40);
    assert!(iv.contains_span(10, 40));
    assert!(iv.contains_span(15, 25));
    assert!(!iv.contains_span(5, 25));
    assert!(!iv.contains_span(35, 45));
}

#[test]
fn test_blank_intersect_both_axes() {
    let mut blank = Blank::new(0i64, 0, 100, 10);
    blank.intersect(&Blank::new(30, 5, 45, 20));
    assert_eq!(blank, Blank::new(30, 5, 45, 10));
    assert_eq!(blank.width(), 15);
    assert!(blank.is_valid());

    blank.intersect(&Blank::new(50, 0, 60, 10));
    assert!(!blank.is_valid());
}

#[test]
fn test_obstacle_validity_and_row_overlap() {
    let obstacle = Obstacle::new(10.0f64, 5.0, 20.0, 15.0);
    assert!(obstacle.is_valid());
    assert!(obstacle.overlaps_rows(0.0, 10.0));
    assert!(obstacle.overlaps_rows(10.0, 20.0));
    // Touching edges only
    assert!(!obstacle.overlaps_rows(15.0, 25.0));
    assert!(!obstacle.overlaps_rows(-5.0, 5.0));

    assert!(!Obstacle::new(20.0f64, 0.0, 10.0, 5.0).is_valid());
    assert!(!Obstacle::new(f64::NAN, 0.0, 10.0, 5.0).is_valid());
}

#[test]
fn test_intersect_sorted_drops_narrow_results() {
    let a = vec![Interval::new(0i64, 100)];
    let b = vec![Interval::new(0i64, 30), Interval::new(45, 100)];
    let c = vec![Interval::new(30i64, 45)];

    assert_eq!(intersect_sorted(&a, &b, 10), b);
    let narrowed = intersect_sorted(&a, &c, 0);
    assert_eq!(narrowed, vec![Interval::new(30, 45)]);
    assert!(intersect_sorted(&a, &c, 20).is_empty());
    assert!(intersect_sorted::<i64>(&[], &a, 0).is_empty());
}

#[test]
fn test_coord_helpers_agree_across_types() {
    assert_eq!(3i32.max_of(7), 7);
    assert_eq!(3.5f32.min_of(-1.0), -1.0);
    assert_eq!(4i64.abs_diff_of(9), 5);
    assert_eq!(9.0f64.abs_diff_of(4.0), 5.0);
    assert_eq!(i64::from_f64_rounded(12.6), Some(13));
    assert_eq!(i32::from_f64_rounded(3e10), None);
    assert!(!Coord::is_finite(f64::INFINITY));
    assert!(Coord::is_finite(7i32));
}
