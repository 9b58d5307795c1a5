//! 합산 누산기 단위 테스트

use approx::assert_abs_diff_eq;
use rayon::prelude::*;

use crate::core::analyze::accumulate::SummedSpectrum;
use crate::core::types::{FREQ_BINS, M_FIN, M_INI};

#[test]
fn 증가만_하고_덮어쓰지_않는다() {
    let sum = SummedSpectrum::new();
    sum.add(2, 100, 1.5);
    sum.add(2, 100, 2.5);
    let snap = sum.snapshot();
    assert_eq!(SummedSpectrum::value(&snap, 2, 100), 4.0);
    // 다른 셀은 그대로
    assert_eq!(SummedSpectrum::value(&snap, 2, 101), 0.0);
    assert_eq!(SummedSpectrum::value(&snap, 3, 100), 0.0);
}

#[test]
fn 비유한_값은_셀을_바꾸지_않는다() {
    let sum = SummedSpectrum::new();
    sum.add(1, 10, 3.0);
    sum.add(1, 10, f64::NAN);
    sum.add(1, 10, f64::INFINITY);
    sum.add(1, 10, f64::NEG_INFINITY);
    let snap = sum.snapshot();
    assert_eq!(SummedSpectrum::value(&snap, 1, 10), 3.0);
}

#[test]
fn 리셋은_전체를_0으로() {
    let sum = SummedSpectrum::new();
    for mode in M_INI..=M_FIN {
        for bin in 0..FREQ_BINS {
            sum.add(mode, bin, 1.0);
        }
    }
    sum.reset();
    let snap = sum.snapshot();
    assert!(snap.iter().all(|&v| v == 0.0));
}

#[test]
fn 빈_주파수_라벨() {
    assert_eq!(SummedSpectrum::bin_freq(0), -50.0);
    assert_eq!(SummedSpectrum::bin_freq(200), 0.0);
    assert_eq!(SummedSpectrum::bin_freq(400), 50.0);
}

#[test]
fn 합산은_반경_순서와_무관() {
    // 순방향 순서와 뒤집힌 순서의 병렬 합산이 허용 오차 안에서 일치
    let values: Vec<f64> = (1..=300).map(|r| (r as f64 * 0.37).sin().abs() + 0.01).collect();

    let forward = SummedSpectrum::new();
    values.par_iter().for_each(|&v| forward.add(2, 57, v));

    let reversed = SummedSpectrum::new();
    values.par_iter().rev().for_each(|&v| reversed.add(2, 57, v));

    let a = SummedSpectrum::value(&forward.snapshot(), 2, 57);
    let b = SummedSpectrum::value(&reversed.snapshot(), 2, 57);
    // 부동소수점 합산 순서 차이는 ULP 수준만 허용
    assert_abs_diff_eq!(a, b, epsilon = 1e-9);
}
