//! 정준 재배열 추출 테스트

use rustfft::num_complex::Complex;

use crate::core::transform::spectrum::{canonical_index, ModeSpectrum};
use crate::core::types::{DIM_RAD, GRID_LEN};

#[test]
fn 합성_출력의_재배열_위치와_허수_부호() {
    // 원시 빈 k에 (k, k)를 심어 두면 정준 인덱스에서 실수부 k,
    // 허수부 -k로 나와야 함
    let mut raw = vec![Complex::new(0.0, 0.0); GRID_LEN];
    for k in 0..DIM_RAD {
        raw[k] = Complex::new(k as f64, k as f64);
    }
    let spec = ModeSpectrum::extract(&raw, 0, 1.0);

    for k in 0..DIM_RAD {
        let jm = canonical_index(k);
        assert_eq!(spec.real(jm), k as f64, "bin {}", k);
        assert_eq!(spec.imag(jm), -(k as f64), "bin {}", k);
        let expect = ((k * k + k * k) as f64).sqrt();
        assert!((spec.abs(jm) - expect).abs() < 1e-9);
    }

    // 나이퀴스트는 양끝 모두
    let nyq = (DIM_RAD / 2) as f64;
    assert_eq!(spec.real(DIM_RAD + 1), nyq);
    assert_eq!(spec.real(1), nyq);
}

#[test]
fn 모드_블록은_고정_스트라이드로_분리() {
    let mut raw = vec![Complex::new(0.0, 0.0); GRID_LEN];
    // 모드 3 블록의 DC 빈에만 값
    raw[3 * DIM_RAD] = Complex::new(7.0, 0.0);
    let spec = ModeSpectrum::extract(&raw, 3, 1.0);
    assert_eq!(spec.real(DIM_RAD / 2 + 1), 7.0);
    // 다른 모드에서는 안 보임
    let other = ModeSpectrum::extract(&raw, 2, 1.0);
    assert_eq!(other.real(DIM_RAD / 2 + 1), 0.0);
}

#[test]
fn norma로_정규화된다() {
    let mut raw = vec![Complex::new(0.0, 0.0); GRID_LEN];
    raw[5] = Complex::new(10.0, -4.0);
    let spec = ModeSpectrum::extract(&raw, 0, 2.0);
    let jm = canonical_index(5);
    assert_eq!(spec.real(jm), 5.0);
    assert_eq!(spec.imag(jm), 2.0);
}

#[test]
fn norma_0이면_비유한_값이_실린다() {
    // 오류가 아니라 "신호 없음" 신호
    let mut raw = vec![Complex::new(0.0, 0.0); GRID_LEN];
    raw[5] = Complex::new(1.0, 0.0);
    let spec = ModeSpectrum::extract(&raw, 0, 0.0);
    let jm = canonical_index(5);
    assert!(spec.real(jm).is_infinite());
    assert!(spec.abs(jm).is_infinite() || spec.abs(jm).is_nan());
}
