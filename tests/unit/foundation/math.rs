use super::*;

#[test]
fn rng_is_deterministic_per_seed() {
    let mut a = Rng64::new(42);
    let mut b = Rng64::new(42);
    let mut c = Rng64::new(43);
    let va: Vec<u64> = (0..4).map(|_| a.next_u64()).collect();
    let vb: Vec<u64> = (0..4).map(|_| b.next_u64()).collect();
    let vc: Vec<u64> = (0..4).map(|_| c.next_u64()).collect();
    assert_eq!(va, vb);
    assert_ne!(va, vc);
}

#[test]
fn rng_pick_stays_in_range() {
    let mut r = Rng64::new(7);
    for _ in 0..1000 {
        assert!(r.pick(5) < 5);
    }
}

#[test]
fn smoothstep_edges_and_degenerate_band() {
    assert_eq!(smoothstep(0.0, 1.0, -1.0), 0.0);
    assert_eq!(smoothstep(0.0, 1.0, 2.0), 1.0);
    assert!((smoothstep(0.0, 1.0, 0.5) - 0.5).abs() < 1e-6);
    assert_eq!(smoothstep(0.5, 0.5, 0.4), 0.0);
    assert_eq!(smoothstep(0.5, 0.5, 0.6), 1.0);
}

#[test]
fn unpremultiply_restores_straight_alpha() {
    let mut px = [64u8, 32, 0, 128, 10, 10, 10, 0, 200, 100, 50, 255];
    unpremultiply_rgba8_in_place(&mut px);
    assert_eq!(&px[0..4], &[128, 64, 0, 128]);
    assert_eq!(&px[4..8], &[0, 0, 0, 0]);
    assert_eq!(&px[8..12], &[200, 100, 50, 255]);
}
