use super::*;

#[test]
fn tick_range_rejects_inverted_bounds() {
    assert!(TickRange::new(10.0, 5.0).is_err());
    assert!(TickRange::new(f64::NAN, 5.0).is_err());
    assert!(TickRange::new(5.0, 5.0).unwrap().is_empty());
}

#[test]
fn tick_range_is_half_open() {
    let r = TickRange::new(0.0, 120.0).unwrap();
    assert!(r.contains(0.0));
    assert!(r.contains(119.5));
    assert!(!r.contains(120.0));
}

#[test]
fn shift_moves_both_bounds() {
    let r = TickRange::new(0.0, 60.0).unwrap().shift(-30.0);
    assert_eq!(r.start, -30.0);
    assert_eq!(r.end, 30.0);
}

#[test]
fn round_tick_is_nearest_and_total() {
    assert_eq!(round_tick(119.4), 119);
    assert_eq!(round_tick(119.6), 120);
    assert_eq!(round_tick(-0.6), -1);
    assert_eq!(round_tick(f64::INFINITY), 0);
}
