//! Tests for reduced-precision utilities.

use super::*;
use approx::assert_relative_eq;
use ndarray::array;
use proptest::prelude::*;

#[test]
fn test_precision_max_finite() {
    assert_eq!(Precision::Fp16.max_finite(), 65504.0);
    assert_eq!(Precision::Fp32.max_finite(), f32::MAX);
    assert!(Precision::Bf16.max_finite() > 3.0e38);
    assert_eq!(Precision::Fp16.round(Precision::Fp16.max_finite()), 65504.0);
    assert_eq!(Precision::Fp16.round(65520.0), f32::INFINITY);
}

#[test]
fn test_precision_round_matches_round_to() {
    for p in [Precision::Fp32, Precision::Fp16, Precision::Bf16] {
        for v in [0.1f32, -3.3, 1e-6, 12345.678] {
            assert_eq!(p.round(v), round_to(v, p));
        }
    }
    assert_eq!(Precision::Fp32.round(0.1), 0.1);
}

#[test]
fn test_precision_display() {
    assert_eq!(Precision::Fp16.to_string(), "fp16");
    assert_eq!(format!("{}", Precision::Bf16), "bf16");
    assert_eq!(Precision::default(), Precision::Fp32);
    assert!(!Precision::Fp32.is_reduced());
    assert!(Precision::Fp16.is_reduced());
}

#[test]
fn test_precision_serde_lowercase() {
    let p: Precision = serde_yaml::from_str("fp16").unwrap();
    assert_eq!(p, Precision::Fp16);
    let s = serde_yaml::to_string(&Precision::Bf16).unwrap();
    assert_eq!(s.trim(), "bf16");
}

#[test]
fn test_fp16_exact_values() {
    for v in [0.0f32, 1.0, -2.0, 0.5, 65504.0, 0.25, 1024.0] {
        assert_eq!(fp16_to_f32(f32_to_fp16(v)), v);
    }
    assert_eq!(f32_to_fp16(1.0), 0x3C00);
    assert_eq!(f32_to_fp16(-2.0), 0xC000);
}

#[test]
fn test_fp16_overflow_to_infinity() {
    assert_eq!(fp16_to_f32(f32_to_fp16(70000.0)), f32::INFINITY);
    assert_eq!(fp16_to_f32(f32_to_fp16(-1e6)), f32::NEG_INFINITY);
    assert!(fp16_to_f32(f32_to_fp16(f32::NAN)).is_nan());
}

#[test]
fn test_fp16_subnormals() {
    let smallest = 2.0f32.powi(-24);
    assert_eq!(f32_to_fp16(smallest), 0x0001);
    assert_eq!(fp16_to_f32(0x0001), smallest);
    // Below half the smallest subnormal flushes to zero
    assert_eq!(fp16_to_f32(f32_to_fp16(smallest * 0.25)), 0.0);
    let sub = 3.0 * 2.0f32.powi(-20);
    assert_eq!(fp16_to_f32(f32_to_fp16(sub)), sub);
}

#[test]
fn test_fp16_round_to_nearest_even() {
    // 1 + 2^-11 is halfway between 1.0 and the next fp16 value; ties go to even
    let tie = 1.0 + 2.0f32.powi(-11);
    assert_eq!(round_to(tie, Precision::Fp16), 1.0);
    let above = 1.0 + 2.0f32.powi(-11) + 2.0f32.powi(-16);
    assert_eq!(round_to(above, Precision::Fp16), 1.0 + 2.0f32.powi(-10));
}

#[test]
fn test_bf16_conversion() {
    assert_eq!(bf16_to_f32(f32_to_bf16(1.0)), 1.0);
    assert_eq!(bf16_to_f32(f32_to_bf16(-3.5)), -3.5);
    // 7 mantissa bits: 1 + 2^-9 rounds down, 1 + 3 * 2^-8 rounds up
    assert_eq!(round_to(1.0 + 2.0f32.powi(-9), Precision::Bf16), 1.0);
    assert_eq!(round_to(1.0 + 3.0 * 2.0f32.powi(-8), Precision::Bf16), 1.0 + 2.0f32.powi(-6));
}

#[test]
fn test_round_array_fp32_is_identity() {
    let mut a = array![[0.1f32, 0.2], [0.3, 1e-9]];
    let before = a.clone();
    round_array(&mut a, Precision::Fp32);
    assert_eq!(a, before);
    round_array(&mut a, Precision::Fp16);
    assert_eq!(a[[1, 1]], 0.0);
    assert_relative_eq!(a[[0, 0]], 0.1, max_relative = 1e-3);
}

#[test]
fn test_scaler_fixed() {
    let mut scaler = LossScaler::fixed(512.0);
    assert!(!scaler.is_dynamic());
    assert_eq!(scaler.scale_loss(2.0), 1024.0);
    scaler.update(false);
    assert_eq!(scaler.scale(), 512.0);
}

#[test]
fn test_scaler_unscale_and_check() {
    let scaler = LossScaler::fixed(4.0);
    let mut grads = vec![4.0f32, 8.0, -2.0];
    assert!(scaler.unscale_and_check(grads.iter_mut()));
    assert_eq!(grads, vec![1.0, 2.0, -0.5]);

    let mut bad = vec![1.0f32, f32::INFINITY];
    assert!(!scaler.unscale_and_check(bad.iter_mut()));
}

#[test]
fn test_scaler_dynamic_backoff_and_growth() {
    let mut scaler = LossScaler::dynamic(512.0, 3);
    scaler.update(false);
    assert_eq!(scaler.scale(), 256.0);
    assert_eq!(scaler.overflow_count(), 1);

    scaler.update(true);
    scaler.update(true);
    assert_eq!(scaler.scale(), 256.0);
    scaler.update(true);
    assert_eq!(scaler.scale(), 512.0);
    assert_eq!(scaler.successful_steps(), 3);
}

#[test]
fn test_scaler_floor() {
    let mut scaler = LossScaler::dynamic(2.0, 10);
    for _ in 0..5 {
        scaler.update(false);
    }
    assert_eq!(scaler.scale(), 1.0);
}

proptest! {
    #[test]
    fn prop_fp16_roundtrip_is_idempotent(v in -60000.0f32..60000.0) {
        let once = round_to(v, Precision::Fp16);
        prop_assert_eq!(round_to(once, Precision::Fp16), once);
    }

    #[test]
    fn prop_fp16_relative_error_bounded(v in 1e-3f32..60000.0) {
        let r = round_to(v, Precision::Fp16);
        prop_assert!(((r - v) / v).abs() <= 2.0f32.powi(-11) + 1e-7);
    }
}
