//! 고정 크기 (DIM_THT x DIM_RAD) 2차원 FFT 엔진
//!
//! 플랜 생성은 한 번만 하고 전 반경/전 워커가 재사용한다. rustfft의
//! 플랜은 Send + Sync라서 워커들이 각자의 버퍼에 대해 동시에 실행해도
//! 안전함. 행(lnr) 방향은 연속 슬라이스라 바로 처리하고, 열(θ) 방향은
//! 전치 -> 행 FFT -> 역전치로 처리한다

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::core::types::{DIM_RAD, DIM_THT, GRID_LEN};

/// 워커 하나가 소유하는 작업 버퍼 묶음
///
/// 극좌표 샘플 격자(`grid`)는 θ-주행 우선 연속 배치. 반경 반복마다
/// 조립기가 전체를 다시 채운다
pub struct FftWorkspace {
    /// 극좌표 샘플 격자 (변환 입력이자 출력, in-place)
    pub grid: Vec<Complex<f64>>,
    /// 열 방향 패스용 전치 버퍼
    transposed: Vec<Complex<f64>>,
    /// rustfft 내부 스크래치
    scratch: Vec<Complex<f64>>,
}

impl FftWorkspace {
    /// 격자 전체를 0으로 되돌린다
    pub fn reset(&mut self) {
        self.grid.fill(Complex::new(0.0, 0.0));
    }
}

/// 전방/역방 2D FFT 플랜 묶음
pub struct SpectralEngine {
    forward_rad: Arc<dyn Fft<f64>>,
    forward_tht: Arc<dyn Fft<f64>>,
    inverse_rad: Arc<dyn Fft<f64>>,
    inverse_tht: Arc<dyn Fft<f64>>,
    scratch_len: usize,
}

impl SpectralEngine {
    /// 네 방향 플랜을 모두 준비한다. 플랜 생성은 실행에 비해 비싸므로
    /// 이미지/반경 루프 바깥에서 한 번만 불러야 함
    pub fn new() -> Self {
        let mut planner = FftPlanner::new();
        let forward_rad = planner.plan_fft_forward(DIM_RAD);
        let forward_tht = planner.plan_fft_forward(DIM_THT);
        let inverse_rad = planner.plan_fft_inverse(DIM_RAD);
        let inverse_tht = planner.plan_fft_inverse(DIM_THT);
        let scratch_len = forward_rad
            .get_inplace_scratch_len()
            .max(forward_tht.get_inplace_scratch_len())
            .max(inverse_rad.get_inplace_scratch_len())
            .max(inverse_tht.get_inplace_scratch_len());
        Self { forward_rad, forward_tht, inverse_rad, inverse_tht, scratch_len }
    }

    /// 워커 소유 작업 버퍼 생성 (스레드 id 인덱싱 대신 소유권으로 격리)
    pub fn make_workspace(&self) -> FftWorkspace {
        FftWorkspace {
            grid: vec![Complex::new(0.0, 0.0); GRID_LEN],
            transposed: vec![Complex::new(0.0, 0.0); GRID_LEN],
            scratch: vec![Complex::new(0.0, 0.0); self.scratch_len],
        }
    }

    /// 전방 변환 (분석 방향). 출력은 `ws.grid`에 in-place,
    /// 배치는 [θ-주파수 행][반경-주파수 열]
    pub fn forward(&self, ws: &mut FftWorkspace) {
        Self::execute(&self.forward_rad, &self.forward_tht, ws);
    }

    /// 역방 변환 (재구성 방향). 정규화는 호출자가 수행
    pub fn backward(&self, ws: &mut FftWorkspace) {
        Self::execute(&self.inverse_rad, &self.inverse_tht, ws);
    }

    fn execute(rad: &Arc<dyn Fft<f64>>, tht: &Arc<dyn Fft<f64>>, ws: &mut FftWorkspace) {
        let FftWorkspace { grid, transposed, scratch } = ws;

        // 행 방향: DIM_THT개의 길이 DIM_RAD 변환을 한 번에
        rad.process_with_scratch(grid, scratch);

        // 열 방향: 전치해서 연속 행으로 만든 뒤 변환
        for row in 0..DIM_THT {
            for col in 0..DIM_RAD {
                transposed[col * DIM_THT + row] = grid[row * DIM_RAD + col];
            }
        }
        tht.process_with_scratch(transposed, scratch);
        for row in 0..DIM_THT {
            for col in 0..DIM_RAD {
                grid[row * DIM_RAD + col] = transposed[col * DIM_THT + row];
            }
        }
    }
}

impl Default for SpectralEngine {
    fn default() -> Self {
        Self::new()
    }
}
