//! 환형 고리 조립기
//!
//! 반경 하나에 대해 극좌표 샘플 격자(θ-주행 우선, 연속 버퍼)의 실수
//! 채널을 채운다. 반경 방향 포함 정책은 실행당 정확히 하나만 적용되고,
//! 코어 마스크 / 막대 마스크 / 가장자리 0 패딩은 그 위에 겹쳐진다.
//!
//! 격자는 채우기 전에 반드시 전체를 0으로 재초기화한다. 이전 반경의
//! 잔존 값이 남으면 결과가 오염됨

use rustfft::num_complex::Complex;

use super::polar;
use crate::core::types::{PixelGrid, DIM_RAD, DIM_THT, GRID_LEN};

/// 반경 방향 포함 정책
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RadialPolicy {
    /// 현재 반경부터 바깥 최대 반경까지: ln r' ∈ [log r, log r_max]
    Standard,
    /// 역방향: ln r' ≤ log(r_max - r + 1)
    Reverse,
    /// 고정 폭 고리: ln r' ∈ [log(r - w/2), log(r + w/2)]
    FixedWindow { width: u32 },
}

/// 조립 옵션. `log_bar`가 0보다 크면 막대 마스크가 켜진 것
#[derive(Debug, Clone, Copy)]
pub struct AnnulusOptions {
    pub policy: RadialPolicy,
    pub core_mask: bool,
    pub edge_zero: bool,
    pub log_bar: f64,
}

impl Default for AnnulusOptions {
    fn default() -> Self {
        Self { policy: RadialPolicy::Standard, core_mask: false, edge_zero: false, log_bar: 0.0 }
    }
}

/// 가장자리 0 패딩이 지우는 각도 행: 앞 2행, 뒤 4행
const EDGE_LEAD: usize = 2;
const EDGE_TRAIL: usize = 4;

/// 고정 폭 정책의 ln 포함 경계 (log(r - w/2), log(r + w/2))
///
/// r ≤ w/2인 반경은 호출 전에 걸러져야 한다 (드라이버가 건너뜀)
pub fn window_bounds(radius: u32, width: u32) -> (f64, f64) {
    let half = f64::from(width) / 2.0;
    ((f64::from(radius) - half).ln(), (f64::from(radius) + half).ln())
}

/// 한 이미지에 대한 환형 고리 조립기
///
/// 이미지와 기하 정보를 한 번 계산해 두고 반경마다 `fill`을 부른다.
/// log 계산은 비싸므로 내부 루프 밖에서 끝낸다
pub struct AnnulusAssembler<'a> {
    image: &'a PixelGrid,
    center: (i64, i64),
    max_radius: u32,
    log_max: f64,
    core_value: f32,
    opts: AnnulusOptions,
}

impl<'a> AnnulusAssembler<'a> {
    pub fn new(image: &'a PixelGrid, max_radius: u32, opts: AnnulusOptions) -> Self {
        let center = polar::image_center(image.width(), image.height());
        let core_value = image.get(center.0 as usize, center.1 as usize);
        Self {
            image,
            center,
            max_radius,
            log_max: f64::from(max_radius).ln(),
            core_value,
            opts,
        }
    }

    pub fn core_value(&self) -> f32 {
        self.core_value
    }

    /// 반경 `radius`의 샘플을 극좌표 격자에 채우고 정규화 합 `norma`를
    /// 돌려준다. 격자 길이는 GRID_LEN이어야 하며 전체가 재초기화됨.
    ///
    /// norma == 0.0은 "데이터 없음" 신호다. 하류 나눗셈이 NaN/Inf를
    /// 만들지만 그건 오류가 아니라 축적 단계에서 걸러질 값
    pub fn fill(&self, radius: u32, grid: &mut [Complex<f64>]) -> f64 {
        assert_eq!(grid.len(), GRID_LEN, "polar grid has fixed dimensions");
        grid.fill(Complex::new(0.0, 0.0));

        let (include_lo, include_hi) = match self.opts.policy {
            RadialPolicy::Standard => (f64::from(radius).ln(), self.log_max),
            RadialPolicy::Reverse => {
                let log_rad = f64::from(self.max_radius - radius + 1).ln();
                (0.0, log_rad.min(self.log_max))
            }
            RadialPolicy::FixedWindow { width } => window_bounds(radius, width),
        };

        let mut norma = 0.0f64;

        for row in 0..DIM_THT {
            if self.opts.edge_zero && (row < EDGE_LEAD || row >= DIM_THT - EDGE_TRAIL) {
                continue;
            }
            let theta = polar::theta_radians(row);
            let base = row * DIM_RAD;

            for col in 0..DIM_RAD {
                let lnr = polar::lnr_at(col);

                if self.opts.log_bar > 0.0 && lnr <= self.opts.log_bar {
                    continue;
                }
                if lnr < include_lo || lnr > include_hi {
                    continue;
                }

                let (px, py) = polar::pixel_at(self.center, lnr, theta);
                let value = match self.image.sample(px, py) {
                    Some(v) => v,
                    None => continue,
                };

                if self.opts.core_mask && value >= self.core_value {
                    continue;
                }

                grid[base + col].re = f64::from(value);
                norma += f64::from(value);
            }
        }

        norma
    }
}

/// `--polar` 출력용: 조립된 격자의 실수 채널을 (lnr 주행 우선) 픽셀
/// 격자로 꺼낸다. 파일에는 θ x lnr 이미지로 기록됨
pub fn polar_projection(grid: &[Complex<f64>]) -> PixelGrid {
    assert_eq!(grid.len(), GRID_LEN);
    let mut out = PixelGrid::zeros(DIM_THT, DIM_RAD);
    for col in 0..DIM_RAD {
        for row in 0..DIM_THT {
            out.set(row, col, grid[row * DIM_RAD + col].re as f32);
        }
    }
    out
}
