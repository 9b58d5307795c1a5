//! # 좌표 매핑 모듈
//!
//! 직교 이미지 <-> 로그-극좌표 격자 변환과 환형 고리 조립

pub mod annulus;
pub mod bar;
pub mod polar;

// 테스트 모듈
#[cfg(test)]
mod __tests__;

// 재수출
pub use annulus::{polar_projection, window_bounds, AnnulusAssembler, AnnulusOptions, RadialPolicy};
pub use bar::find_bar;
pub use polar::{cartesian_offset, image_center, lnr_at, pixel_at, theta_radians};
