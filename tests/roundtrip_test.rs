//! 전방 -> 역방 왕복 통합 테스트
//!
//! 단일 모드 사인파 극좌표 패턴을 전방 변환해 레코드 파일로 저장하고,
//! 그 파일을 다시 읽어 역변환하면 원래 패턴의 지배 주파수와 피치 각이
//! 재현되어야 한다

use std::f64::consts::PI;

use rustfft::num_complex::Complex;
use tempfile::tempdir;

use spiral2dfft::core::analyze::pitch::{analyze, AnalysisState};
use spiral2dfft::core::reconstruct::accumulate_record;
use spiral2dfft::core::transform::{ModeSpectrum, SpectralEngine};
use spiral2dfft::core::types::{DIM_RAD, DIM_THT, GRID_LEN, STEP_P};
use spiral2dfft::io::records;

/// 모드 m, 반경 주파수 p의 사인파 극좌표 격자
fn sinusoid(mode: f64, p: f64) -> Vec<Complex<f64>> {
    let mut grid = vec![Complex::new(0.0, 0.0); GRID_LEN];
    for row in 0..DIM_THT {
        for col in 0..DIM_RAD {
            let phase = 2.0
                * PI
                * (mode * row as f64 / DIM_THT as f64
                    + (p / STEP_P) * col as f64 / DIM_RAD as f64);
            grid[row * DIM_RAD + col] = Complex::new(phase.cos(), 0.0);
        }
    }
    grid
}

#[test]
fn 사인파_왕복은_지배_주파수와_피치각을_재현한다() {
    let engine = SpectralEngine::new();
    let dir = tempdir().unwrap();

    // 전방: 모드 2, 주파수 +4.0 패턴
    let mut ws = engine.make_workspace();
    ws.grid.copy_from_slice(&sinusoid(2.0, 4.0));
    engine.forward(&mut ws);
    let spec = ModeSpectrum::extract(&ws.grid, 2, 1.0);

    // 분석: 피크 주파수 4.0, 피치 각 atan2(2, 4) = 26.565도 (±0.5도)
    let (res, state) = analyze(&spec, 2);
    assert_eq!(state, AnalysisState::Complete);
    assert_eq!(res.freq, 4.0);
    assert!((res.pa - 26.565).abs() < 0.5, "pitch {}", res.pa);

    // 레코드 파일로 저장 후 재로드
    let rip_file = records::rip_path(dir.path(), "outi", 1, 2);
    records::write_rip(&rip_file, 1024, 1.0, &spec).unwrap();
    let rip = records::read_rip(&rip_file).unwrap();
    assert!(records::rip_count_ok(&rip));

    // 역방: 모드 2 블록만 복원해 역변환
    let mut inv = engine.make_workspace();
    accumulate_record(&mut inv.grid, 2, &rip);
    engine.backward(&mut inv);
    for cell in inv.grid.iter_mut() {
        cell.re /= GRID_LEN as f64;
        cell.im /= GRID_LEN as f64;
    }

    // 한쪽 모드 블록만 살렸으므로 실수부는 원래 패턴의 절반 진폭
    let expected = sinusoid(2.0, 4.0);
    let mut max_err = 0.0f64;
    for idx in 0..GRID_LEN {
        let err = (inv.grid[idx].re - 0.5 * expected[idx].re).abs();
        if err > max_err {
            max_err = err;
        }
    }
    // %e 표기 반올림(유효 7자리)까지 감안한 허용 오차
    assert!(max_err < 1e-4, "max error {}", max_err);

    // 재구성 스펙트럼을 다시 분석해도 같은 지배 주파수
    let mut ws2 = engine.make_workspace();
    ws2.grid.copy_from_slice(&inv.grid);
    engine.forward(&mut ws2);
    let spec2 = ModeSpectrum::extract(&ws2.grid, 2, 1.0);
    let (res2, state2) = analyze(&spec2, 2);
    assert_eq!(state2, AnalysisState::Complete);
    assert_eq!(res2.freq, 4.0);
    assert!((res2.pa - res.pa).abs() < 0.5);
}

#[test]
fn 합산_스펙트럼은_반경_순서에_무관하다() {
    use spiral2dfft::core::analyze::SummedSpectrum;

    // 반경별 기여를 흉내낸 값들을 두 순서로 합산
    let contributions: Vec<(usize, f64)> =
        (1..=128).map(|r| (r % 401, (r as f64 * 0.731).cos().abs())).collect();

    let a = SummedSpectrum::new();
    for &(bin, v) in &contributions {
        a.add(3, bin, v);
    }
    let b = SummedSpectrum::new();
    for &(bin, v) in contributions.iter().rev() {
        b.add(3, bin, v);
    }

    let sa = a.snapshot();
    let sb = b.snapshot();
    for bin in 0..401 {
        let va = SummedSpectrum::value(&sa, 3, bin);
        let vb = SummedSpectrum::value(&sb, 3, bin);
        assert!((va - vb).abs() < 1e-9, "bin {}", bin);
    }
}
