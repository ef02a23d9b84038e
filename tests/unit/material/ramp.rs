use super::*;

#[test]
fn hard_ramp_has_one_level_per_step() {
    for steps in [2, 3, 4, 6] {
        let ramp = ToonRamp::generate(steps, 0.0);
        assert_eq!(ramp.distinct_levels(), steps as usize, "steps={steps}");
        assert_eq!(ramp.image().dimensions(), (256, 1));
    }
}

#[test]
fn ramp_is_monotonic_and_spans_full_range() {
    let ramp = ToonRamp::generate(4, 0.3);
    let px: Vec<u8> = ramp.image().pixels().map(|p| p.0[0]).collect();
    assert!(px.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(px[0], 0);
    assert_eq!(px[255], 255);
}

#[test]
fn smoothness_adds_transition_texels() {
    let hard = ToonRamp::generate(3, 0.0);
    let soft = ToonRamp::generate(3, 0.5);
    assert!(soft.distinct_levels() > hard.distinct_levels());
}

#[test]
fn degenerate_inputs_are_clamped() {
    let ramp = ToonRamp::generate(0, f32::NAN);
    assert_eq!(ramp.steps(), 1);
    assert_eq!(ramp.smoothness(), 0.0);
    assert_eq!(ramp.sample(0.0), 1.0);
    assert_eq!(ramp.sample(-5.0), ramp.sample(0.0));
}
