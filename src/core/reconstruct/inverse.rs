//! 역변환 재구성기
//!
//! 저장된 반경별 스펙트럼 레코드를 반경 범위에 걸쳐 모드 블록에 합산한
//! 뒤, 역방향 2D FFT 한 번과 극좌표 -> 직교 재매핑으로 재구성 이미지를
//! 만든다. 빈 배치는 forward 추출과 같은 정준 매핑 함수를 쓴다

use ndarray::Array2;
use rustfft::num_complex::Complex;

use crate::core::mapping::polar;
use crate::core::transform::engine::{FftWorkspace, SpectralEngine};
use crate::core::transform::spectrum::transform_bin;
use crate::core::types::{PixelGrid, RipRecord, DIM_RAD, DIM_THT, FREQ_BINS, FREQ_LO_INDEX, GRID_LEN};

/// 레코드 하나를 극좌표 격자의 `mode` 블록에 더해 넣는다
///
/// 기록 파일의 허수부는 추출 때 부호가 뒤집혀 있으므로 여기서 -1을
/// 곱해 FFT 규약으로 되돌린다. 비유한 성분은 성분 단위로 건너뛴다
pub fn accumulate_record(grid: &mut [Complex<f64>], mode: usize, rip: &RipRecord) {
    assert_eq!(grid.len(), GRID_LEN);
    for (l, pair) in rip.values.chunks(2).take(FREQ_BINS).enumerate() {
        let jm = FREQ_LO_INDEX + l;
        let idx = mode * DIM_RAD + transform_bin(jm);
        if pair[0].is_finite() {
            grid[idx].re += pair[0];
        }
        if let Some(&im) = pair.get(1) {
            if im.is_finite() {
                grid[idx].im += -1.0 * im;
            }
        }
    }
}

/// 합산이 끝난 격자를 역변환하고 직교 이미지로 재매핑한다
///
/// `end_radius`보다 바깥 로그-반경 셀은 쓰지 않는다 (기본 호출자는
/// 관측 최대 반경의 90%를 넘긴다 - 바깥 10% 고리는 퇴화 샘플로 알려져
/// 있음). NaN 출력 값은 누산과 카운트 모두에서 제외된다.
/// 출력 크기는 (2*max_radius + 1) 제곱, 카운트가 0인 픽셀은 배경 0
pub fn reconstruct(
    engine: &SpectralEngine,
    ws: &mut FftWorkspace,
    max_radius: u32,
    end_radius: u32,
) -> PixelGrid {
    engine.backward(ws);

    // 전체 샘플 수로 정규화
    let norm = GRID_LEN as f64;
    for cell in ws.grid.iter_mut() {
        cell.re /= norm;
        cell.im /= norm;
    }

    let dim = (max_radius as usize) * 2 + 1;
    let center = (max_radius as i64, max_radius as i64);
    let log_edge = f64::from(end_radius).ln();

    let mut acc = Array2::<f64>::zeros((dim, dim));
    let mut counts = Array2::<f64>::zeros((dim, dim));

    for row in 0..DIM_THT {
        let theta = polar::theta_radians(row);
        for col in 0..DIM_RAD {
            let lnr = polar::lnr_at(col);
            if lnr > log_edge {
                continue;
            }
            let value = ws.grid[row * DIM_RAD + col].re;
            if value.is_nan() {
                continue;
            }
            let (px, py) = polar::pixel_at(center, lnr, theta);
            if px < 0 || py < 0 || px as usize >= dim || py as usize >= dim {
                continue;
            }
            acc[[py as usize, px as usize]] += value;
            counts[[py as usize, px as usize]] += 1.0;
        }
    }

    // 극좌표에서 중복 방문한 픽셀은 평균으로 정리
    let mut out = PixelGrid::zeros(dim, dim);
    for y in 0..dim {
        for x in 0..dim {
            let n = counts[[y, x]];
            if n > 0.0 {
                out.set(x, y, (acc[[y, x]] / n) as f32);
            }
        }
    }
    out
}
