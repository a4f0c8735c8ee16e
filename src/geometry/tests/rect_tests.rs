//! Tests for rectangle algebra

use crate::geometry::point::Point;
use crate::geometry::rect::Rectangle;

#[test]
fn test_intersect_is_idempotent() {
    let r = Rectangle::from_min_max(5.0, 85.0, 32.0, 40.0);
    assert_eq!(r.intersect(&r), r);
}

#[test]
fn test_empty_identities() {
    let r = Rectangle::from_min_max(5.0, 85.0, 32.0, 40.0);
    let empty = Rectangle::empty();

    assert_eq!(r.union(&empty), r);
    assert_eq!(empty.union(&r), r);
    assert!(r.intersect(&empty).is_empty());
    assert!(empty.intersect(&r).is_empty());
    assert!(empty.intersect(&empty).is_empty());
}

#[test]
fn test_contained_intersection() {
    // A box fully inside another intersects to itself
    let inner = Rectangle::from_min_max(5.0, 85.0, 32.0, 40.0);
    let outer = Rectangle::from_min_max(0.0, 90.0, 30.0, 40.0);
    assert_eq!(inner.intersect(&outer), inner);
}

#[test]
fn test_disjoint_intersection_is_empty() {
    let a = Rectangle::from_min_max(0.0, 10.0, 0.0, 10.0);
    let b = Rectangle::from_min_max(20.0, 30.0, 20.0, 30.0);
    assert!(a.intersect(&b).is_empty());
}

#[test]
fn test_union_covers_both() {
    let a = Rectangle::from_min_max(0.0, 10.0, 0.0, 10.0);
    let b = Rectangle::from_min_max(5.0, 30.0, -5.0, 8.0);
    let u = a.union(&b);
    assert_eq!(u, Rectangle::from_min_max(0.0, 30.0, -5.0, 10.0));
}

#[test]
fn test_negative_size_collapses_to_empty() {
    let r = Rectangle::new(0.0, 0.0, -3.0, 5.0);
    assert!(r.is_empty());
    assert_eq!(r.area(), 0.0);
}

#[test]
fn test_from_points_orders_axes() {
    let r = Rectangle::from_points(Point::new(10.0, 2.0), Point::new(-4.0, 8.0));
    assert_eq!(r, Rectangle::from_min_max(-4.0, 10.0, 2.0, 8.0));
}

#[test]
fn test_corner_views() {
    let r = Rectangle::from_min_max(1.0, 3.0, 2.0, 5.0);
    let corners = r.corners();
    assert_eq!(corners[0], Point::new(1.0, 2.0));
    assert_eq!(corners[2], Point::new(3.0, 5.0));

    let (upper_left, lower_right) = r.window_corners();
    assert_eq!(upper_left, Point::new(1.0, 5.0));
    assert_eq!(lower_right, Point::new(3.0, 2.0));
}

#[test]
fn test_align_snaps_outward() {
    let r = Rectangle::from_min_max(0.3, 2.2, 0.7, 1.9);
    let aligned = r.align(Point::new(0.0, 0.0), (0.5, 0.5));
    assert_eq!(aligned, Rectangle::from_min_max(0.0, 2.5, 0.5, 2.0));
    // Alignment must contain the input
    assert_eq!(aligned.intersect(&r), r);
}

#[test]
fn test_align_handles_negative_pixel_height() {
    let r = Rectangle::from_min_max(0.3, 2.2, 0.7, 1.9);
    let down = r.align(Point::new(0.0, 0.0), (0.5, -0.5));
    let up = r.align(Point::new(0.0, 0.0), (0.5, 0.5));
    assert_eq!(down, up);
}

#[test]
fn test_to_pixel_grid_rounds_outward() {
    let r = Rectangle::from_min_max(0.0, 10.1, 0.0, 20.0);
    assert_eq!(r.to_pixel_grid((1.0, -1.0)), (11, 20));
    assert_eq!(Rectangle::empty().to_pixel_grid((1.0, 1.0)), (0, 0));
}

#[test]
fn test_partition_is_row_major_from_top() {
    let r = Rectangle::from_min_max(0.0, 4.0, 0.0, 4.0);
    let cells = r.partition(2);
    assert_eq!(cells.len(), 4);

    // First cell is the top-left quarter
    assert_eq!(cells[0], Rectangle::from_min_max(0.0, 2.0, 2.0, 4.0));
    // Second cell is to its right
    assert_eq!(cells[1], Rectangle::from_min_max(2.0, 4.0, 2.0, 4.0));
    // Last cell is the bottom-right quarter
    assert_eq!(cells[3], Rectangle::from_min_max(2.0, 4.0, 0.0, 2.0));

    // Cells tile the original exactly
    let reunion = cells.iter().fold(Rectangle::empty(), |acc, c| acc.union(c));
    assert_eq!(reunion, r);
}

#[test]
fn test_partition_of_empty_is_empty() {
    assert!(Rectangle::empty().partition(3).is_empty());
    assert!(Rectangle::from_min_max(0.0, 1.0, 0.0, 1.0).partition(0).is_empty());
}
