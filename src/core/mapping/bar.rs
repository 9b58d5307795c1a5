//! 막대(bar) 반경 추정
//!
//! 방사형 마스크 옵션용. 중심에서 각도별로 바깥으로 걸어 나가면서
//! 밝기가 한계값 이상으로 유지되는 가장 큰 로그-반경을 기록한다.
//! 한 번 한계 아래로 떨어진 방향은 그 뒤 반경을 더 보지 않는다

use log::debug;

use super::polar;
use crate::core::types::{PixelGrid, DIM_RAD, DIM_THT};

/// 추정된 막대의 ln(반경). 마스크 하한으로 쓰인다.
///
/// `limit`은 보통 중심 픽셀 밝기. 어느 방향에서도 한계 이상 픽셀이
/// 없으면 0.0 (마스크 없음과 동일)
pub fn find_bar(image: &PixelGrid, max_radius: u32, limit: f32) -> f64 {
    let center = polar::image_center(image.width(), image.height());
    let log_edge = f64::from(max_radius).ln();
    let mut log_bar = 0.0f64;

    for row in 0..DIM_THT {
        let theta = polar::theta_radians(row);
        let mut blocked = false;

        for col in 0..DIM_RAD {
            let lnr = polar::lnr_at(col);
            if blocked || lnr > log_edge {
                continue;
            }

            let (px, py) = polar::pixel_at(center, lnr, theta);
            let value = match image.sample(px, py) {
                Some(v) => v,
                None => continue,
            };

            if value >= limit {
                if lnr > log_bar {
                    log_bar = lnr;
                }
            } else {
                blocked = true;
            }
        }
    }

    debug!("bar length: {} (ln {})", log_bar.exp() as i64, log_bar);
    log_bar
}
