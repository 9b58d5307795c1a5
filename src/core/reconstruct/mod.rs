//! # 역변환 재구성 모듈

pub mod inverse;


// 재수출
pub use inverse::{accumulate_record, reconstruct};
