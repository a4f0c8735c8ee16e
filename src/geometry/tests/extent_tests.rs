//! Tests for the sampling extent transformer

use crate::geometry::crs::CoordinateSystem;
use crate::geometry::extent::{Extent, ExtentTransformer};
use crate::geometry::rect::Rectangle;
use crate::geometry::transform::{CrsTransform, IdentityTransform};

#[test]
fn test_identity_returns_input_unchanged() {
    let transformer = ExtentTransformer::new(1000);
    let r = Rectangle::from_min_max(-10.0, 30.0, 40.0, 60.0);
    assert_eq!(transformer.transform(&r, &IdentityTransform), r);
}

#[test]
fn test_empty_and_degenerate_inputs_yield_empty() {
    let transformer = ExtentTransformer::new(1000);
    let t = CrsTransform::between(CoordinateSystem::WGS84, CoordinateSystem::WebMercator).unwrap();

    assert!(transformer.transform(&Rectangle::empty(), &t).is_empty());
    let line = Rectangle::from_min_max(0.0, 10.0, 5.0, 5.0);
    assert!(transformer.transform(&line, &t).is_empty());
}

#[test]
fn test_transform_covers_the_projected_region() {
    let transformer = ExtentTransformer::new(1000);
    let t = CrsTransform::between(CoordinateSystem::WGS84, CoordinateSystem::WebMercator).unwrap();

    let r = Rectangle::from_min_max(-10.0, 30.0, 40.0, 60.0);
    let mapped = transformer.transform(&r, &t);
    assert!(!mapped.is_empty());

    // One degree of longitude is ~111.3 km in Web Mercator
    assert!((mapped.min_x() - -1_113_195.0).abs() < 5_000.0);
    // The northern edge is included by the sampling grid
    assert!((mapped.max_y() - 8_399_738.0).abs() < 15_000.0);
}

#[test]
fn test_round_trip_error_shrinks_with_sample_count() {
    let forward = CrsTransform::between(CoordinateSystem::WGS84, CoordinateSystem::WebMercator).unwrap();
    let back = forward.inverse();
    let original = Rectangle::from_min_max(-10.0, 30.0, 40.0, 60.0);

    let round_trip_error = |samples: usize| -> f64 {
        let transformer = ExtentTransformer::new(samples);
        let there = transformer.transform(&original, &forward);
        let and_back = transformer.transform(&there, &back);
        let dx = (and_back.min_x() - original.min_x()).abs()
            .max((and_back.max_x() - original.max_x()).abs());
        let dy = (and_back.min_y() - original.min_y()).abs()
            .max((and_back.max_y() - original.max_y()).abs());
        dx.max(dy)
    };

    let coarse = round_trip_error(64);
    let fine = round_trip_error(4096);
    assert!(fine < coarse, "expected {} < {}", fine, coarse);
    // The right edge is the one the half-open grid undershoots; at 4096
    // samples the accumulated undershoot stays within a degree or so
    assert!(fine < 2.0, "fine error was {}", fine);
}

#[test]
fn test_region_outside_domain_yields_empty() {
    let transformer = ExtentTransformer::new(500);
    let t = CrsTransform::between(CoordinateSystem::WGS84, CoordinateSystem::WebMercator).unwrap();

    // Entirely north of the Web Mercator latitude limit
    let polar = Rectangle::from_min_max(-20.0, 20.0, 86.0, 89.0);
    assert!(transformer.transform(&polar, &t).is_empty());
}

#[test]
fn test_extent_transformed_to_other_crs() {
    let extent = Extent::new(
        CoordinateSystem::WGS84,
        Rectangle::from_min_max(4.0, 6.0, 50.0, 53.0),
    );
    let mapped = extent.transformed_to(CoordinateSystem::WebMercator, 1000).unwrap();
    assert_eq!(mapped.crs, CoordinateSystem::WebMercator);
    assert!(!mapped.rect.is_empty());
    assert!(mapped.rect.min_x() > 400_000.0 && mapped.rect.max_x() < 700_000.0);
}
