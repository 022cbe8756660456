#![cfg(feature = "host")]
#![allow(missing_docs)]
//! Host-level tests for the degrees/microseconds mapping.

use servo_envoy::servo::symmetric_map;

const BOUNDS: [(i32, i32); 8] = [
    (1_000, 2_000),
    (544, 2_400),
    (500, 2_500),
    (200, 3_000),
    (200, 250),
    (1_000, 1_001),
    (1_234, 1_876),
    (2_999, 3_000),
];

#[test]
fn endpoints_map_exactly() {
    for (min_us, max_us) in BOUNDS {
        assert_eq!(symmetric_map(0, 0, 180, min_us, max_us), min_us);
        assert_eq!(symmetric_map(180, 0, 180, min_us, max_us), max_us);
        assert_eq!(symmetric_map(min_us, min_us, max_us, 0, 180), 0);
        assert_eq!(symmetric_map(max_us, min_us, max_us, 0, 180), 180);
    }
}

#[test]
fn rounds_to_nearest_instead_of_truncating() {
    // 1 degree on a 1000 µs span is 5.55 µs: truncation would give 1005.
    assert_eq!(symmetric_map(1, 0, 180, 1_000, 2_000), 1_006);
    assert_eq!(symmetric_map(90, 0, 180, 1_000, 2_000), 1_500);
    assert_eq!(symmetric_map(1_503, 1_000, 2_000, 0, 180), 91);
}

#[test]
fn one_bounce_is_stable_for_every_angle() {
    for (min_us, max_us) in BOUNDS {
        for angle in 0..=180 {
            let us = symmetric_map(angle, 0, 180, min_us, max_us);
            let degrees = symmetric_map(us, min_us, max_us, 0, 180);
            let us_again = symmetric_map(degrees, 0, 180, min_us, max_us);
            assert_eq!(us_again, us, "bounds {min_us}..{max_us}, angle {angle}");
        }
    }
}

#[test]
fn wide_spans_recover_the_original_angle() {
    for angle in 0..=180 {
        let us = symmetric_map(angle, 0, 180, 544, 2_400);
        assert_eq!(symmetric_map(us, 544, 2_400, 0, 180), angle);
    }
}

#[test]
fn empty_input_range_maps_to_min_out() {
    assert_eq!(symmetric_map(1_500, 1_500, 1_500, 0, 180), 0);
}

#[test]
fn works_in_const_context() {
    const NEUTRAL: i32 = symmetric_map(90, 0, 180, 500, 2_500);
    assert_eq!(NEUTRAL, 1_500);
}

#[test]
fn extreme_inputs_saturate_instead_of_overflowing() {
    assert_eq!(symmetric_map(i32::MAX, 0, 180, 0, 3_000), i32::MAX);
    assert_eq!(symmetric_map(i32::MIN, 0, 180, 0, 3_000), i32::MIN);
    assert_eq!(
        symmetric_map(0, i32::MIN, i32::MAX, i32::MIN, i32::MAX),
        0
    );
    // Out-of-range values that still fit keep the same rounding.
    assert_eq!(symmetric_map(360, 0, 180, 1_000, 2_000), 3_000);
    assert_eq!(symmetric_map(-1, 0, 180, 1_000, 2_000), 995);
}
