//! 좌표 변환 단위 테스트

use approx::assert_relative_eq;

use crate::core::mapping::polar::{cartesian_offset, image_center, lnr_at, pixel_at, theta_radians};
use crate::core::types::{DIM_RAD, DIM_THT, RAD_STEP, STEP_P};
use std::f64::consts::PI;

#[test]
fn 직교_오프셋_기본_방향_테스트() {
    // θ=0이면 +x 방향, ln r = ln 10이면 반경 10
    let (x, y) = cartesian_offset(10.0f64.ln(), 0.0);
    assert_relative_eq!(x, 10.0, epsilon = 1e-9);
    assert_relative_eq!(y, 0.0, epsilon = 1e-9);

    // θ=π/2이면 +y 방향
    let (x, y) = cartesian_offset(10.0f64.ln(), PI / 2.0);
    assert_relative_eq!(x, 0.0, epsilon = 1e-9);
    assert_relative_eq!(y, 10.0, epsilon = 1e-9);
}

#[test]
fn 이미지_중심은_양쪽_패리티에서_일관() {
    // 홀수 크기: 정확히 가운데
    assert_eq!(image_center(101, 101), (50, 50));
    // 짝수 크기: (dim-1)/2
    assert_eq!(image_center(100, 100), (49, 49));
    assert_eq!(image_center(64, 32), (31, 15));
}

#[test]
fn 각도는_전체_구간을_균등_분할() {
    assert_relative_eq!(theta_radians(0), 0.0);
    // DIM_THT 스텝이면 정확히 한 바퀴
    assert_relative_eq!(theta_radians(DIM_THT), 2.0 * PI, epsilon = 1e-9);
}

#[test]
fn 로그반경_스텝이_빈_간격을_만든다() {
    // 샘플 간격의 역수가 STEP_P 간격의 주파수 빈을 만들어야 함
    assert_relative_eq!(lnr_at(1), RAD_STEP);
    assert_relative_eq!(2.0 * PI / (RAD_STEP * DIM_RAD as f64), STEP_P, epsilon = 1e-12);
}

#[test]
fn 픽셀_좌표는_절단_캐스팅() {
    // exp(ln 2.9) * cos(0) = 2.9 -> 절단하면 2
    let (px, py) = pixel_at((10, 10), 2.9f64.ln(), 0.0);
    assert_eq!(px, 12);
    assert_eq!(py, 10);
}
