//! # 스펙트럼 분석 모듈
//!
//! 피크/피치/SNR/FWHM 계산과 반경 간 합산 누산기

pub mod accumulate;
pub mod pitch;

// 테스트 모듈
#[cfg(test)]
mod __tests__;

// 재수출
pub use accumulate::SummedSpectrum;
pub use pitch::{analyze, fwhm, pitch_phase, snr, AnalysisState, PitchError, Stage};
