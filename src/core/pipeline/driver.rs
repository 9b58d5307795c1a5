//! forward 파이프라인 드라이버
//!
//! 이미지 하나에 대해: 반경 루프를 워커 풀로 병렬 실행하고, 반경마다
//! 환형 고리 조립 -> 2D FFT -> 모드별 추출/기록/분석을 수행한 뒤,
//! 반경 배리어 이후 모드별 요약과 합산 스펙트럼 파일을 쓴다.
//!
//! 워커마다 자기 작업 버퍼를 소유한다 (rayon map_init). 공유 가변
//! 상태는 합산 누산기뿐이고, 반경별 파일은 반경 고유 이름이라 어떤
//! 워커가 계산하든 충돌하지 않는다

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::core::analyze::accumulate::SummedSpectrum;
use crate::core::analyze::pitch::{analyze, AnalysisState};
use crate::core::mapping::annulus::{AnnulusAssembler, AnnulusOptions, RadialPolicy};
use crate::core::mapping::bar::find_bar;
use crate::core::mapping::{annulus, polar};
use crate::core::transform::engine::{FftWorkspace, SpectralEngine};
use crate::core::transform::spectrum::{bin_frequency, ModeSpectrum};
use crate::core::types::{
    FileRec, ModeRadiusMap, RadiusAnalysis, FREQ_BINS, FREQ_HI_INDEX, FREQ_LO_INDEX, M_FIN, M_INI,
    NUM_MODES, STEP_P,
};
use crate::io::{fits, records};

/// 파일 헤더에 기록하는 프로그램 태그
pub const PROGRAM_TAG: &str = "spiral2dfft/";

/// 버전 태그
pub const VERSION_TAG: &str = "0.1.0";

/// 실행 옵션 (CLI 플래그가 그대로 내려온다)
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// 반경 방향 포함 정책
    pub policy: RadialPolicy,
    /// 중심 밝기 이상 픽셀 마스킹
    pub core_mask: bool,
    /// 막대 반경 추정 후 안쪽 마스킹
    pub bar_mask: bool,
    /// 가장자리 각도 행 0 패딩
    pub edge_zero: bool,
    /// 기록/분석 전 저주파 빈 제거
    pub high_pass: bool,
    /// 로그-극좌표 투영 이미지 출력
    pub polar_out: bool,
    /// 계산 단계 실패를 경고로 출력할지
    pub warn_computation: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            policy: RadialPolicy::Standard,
            core_mask: false,
            bar_mask: false,
            edge_zero: false,
            high_pass: false,
            polar_out: false,
            warn_computation: false,
        }
    }
}

/// 이미지 한 건의 처리 결과
#[derive(Debug, Serialize)]
pub struct ImageReport {
    pub name: String,
    pub result: String,
    pub radius: u32,
    /// 실제로 계산된 반경 수 (고정 폭 정책은 양끝을 건너뜀)
    pub radii_processed: usize,
    /// 반경별 레코드 파일 기록 실패 수 (해당 반경 기여만 빠짐)
    pub record_failures: usize,
}

/// 실행 전체 요약 (JSON 출력용)
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub errored: usize,
}

/// 반경 하나의 계산 결과 묶음 (병렬 워커의 반환 값)
struct RadiusRow {
    radius: u32,
    records: [RadiusAnalysis; NUM_MODES],
    write_failures: usize,
}

/// forward 파이프라인
///
/// FFT 플랜은 생성 시 한 번 만들어 모든 이미지와 워커가 공유한다
pub struct Pipeline {
    engine: SpectralEngine,
    opts: RunOptions,
}

impl Pipeline {
    pub fn new(opts: RunOptions) -> Self {
        Self { engine: SpectralEngine::new(), opts }
    }

    pub fn engine(&self) -> &SpectralEngine {
        &self.engine
    }

    /// 이미지 하나를 끝까지 처리한다
    ///
    /// 여기서 나는 오류는 "이미지 단위" 오류다: 호출자는 세고 다음
    /// 이미지로 넘어간다. 반경 단위 실패는 내부에서 삼키고 레코드만
    /// 비운다
    pub fn process_image(&self, rec: &FileRec) -> Result<ImageReport> {
        info!("처리 시작: {}", rec.name);

        let image = if rec.binary {
            fits::read(&rec.name).with_context(|| format!("이미지 읽기 실패: {}", rec.name))?
        } else {
            fits::read_ascii(&rec.name)
                .with_context(|| format!("텍스트 격자 읽기 실패: {}", rec.name))?
        };
        let (w, h) = (image.width(), image.height());

        // 반경이 없으면 짧은 축에서 유도 (정사각형 강제 없음)
        let max_radius = match rec.radius {
            Some(r) => r,
            None => ((w.min(h) - 1) / 2) as u32,
        };
        if max_radius < 2 {
            bail!("이미지가 너무 작음 ({}x{}): 반경 {}", w, h, max_radius);
        }
        debug!("{}: {}x{}, 반경 {}", rec.name, w, h, max_radius);

        // 막대 마스킹은 중심 밝기를 한계로 중심부를 먼저 스캔
        let log_bar = if self.opts.bar_mask {
            let center = polar::image_center(w, h);
            let ctr_val = image.get(center.0 as usize, center.1 as usize);
            let lb = find_bar(&image, max_radius, ctr_val);
            info!("{}: 추정 막대 반경 {:.1}", rec.name, lb.exp());
            lb
        } else {
            0.0
        };

        let annulus_opts = AnnulusOptions {
            policy: self.opts.policy,
            core_mask: self.opts.core_mask,
            edge_zero: self.opts.edge_zero,
            log_bar,
        };
        let assembler = AnnulusAssembler::new(&image, max_radius, annulus_opts);

        // 반경별 레코드 파일이 들어갈 디렉토리
        let out_dir = PathBuf::from(&rec.result);
        fs::create_dir_all(&out_dir)
            .with_context(|| format!("결과 디렉토리 생성 실패: {}", out_dir.display()))?;

        let summed = SummedSpectrum::new();

        // 고정 폭 정책은 창이 이미지를 벗어나는 양끝 반경을 건너뜀
        let radii: Vec<u32> = (1..max_radius)
            .filter(|&r| match self.opts.policy {
                RadialPolicy::FixedWindow { width } => {
                    r > width / 2 && r < max_radius.saturating_sub(width / 2)
                }
                _ => true,
            })
            .collect();
        if radii.is_empty() {
            bail!("계산할 반경이 없음 (반경 {}, 정책 {:?})", max_radius, self.opts.policy);
        }

        let rows: Vec<RadiusRow> = radii
            .par_iter()
            .map_init(
                || self.engine.make_workspace(),
                |ws, &radius| self.process_radius(rec, &assembler, &summed, ws, radius, w),
            )
            .collect();

        // 배리어 통과. 이제 합산 스펙트럼을 읽어도 된다
        let mut map = ModeRadiusMap::new(max_radius);
        let mut record_failures = 0usize;
        for row in &rows {
            record_failures += row.write_failures;
            for mode in M_INI..=M_FIN {
                map.insert(mode, row.radius, row.records[mode - M_INI]);
            }
        }

        let snapshot = summed.snapshot();
        for mode in M_INI..=M_FIN {
            let summary = format!("{}_m{}", rec.result, mode);
            records::write_mode_summary(Path::new(&summary), mode, &rec.keyword, &map)
                .with_context(|| format!("요약 기록 실패: {}", summary))?;

            let sum_file = format!("{}_sum_m{}", rec.result, mode);
            let sum_rows: Vec<(f64, f64)> = (0..FREQ_BINS)
                .map(|bin| {
                    (SummedSpectrum::bin_freq(bin), SummedSpectrum::value(&snapshot, mode, bin))
                })
                .collect();
            records::write_sum_summary(Path::new(&sum_file), &sum_rows)
                .with_context(|| format!("합산 기록 실패: {}", sum_file))?;
        }

        info!("처리 완료: {} (반경 {}개)", rec.name, rows.len());
        Ok(ImageReport {
            name: rec.name.clone(),
            result: rec.result.clone(),
            radius: max_radius,
            radii_processed: rows.len(),
            record_failures,
        })
    }

    /// 반경 하나: 조립 -> 변환 -> 모드별 추출/기록/분석
    fn process_radius(
        &self,
        rec: &FileRec,
        assembler: &AnnulusAssembler<'_>,
        summed: &SummedSpectrum,
        ws: &mut FftWorkspace,
        radius: u32,
        width: usize,
    ) -> RadiusRow {
        let norma = assembler.fill(radius, &mut ws.grid);

        // 투영 이미지는 첫 반경의 격자가 전체 투영과 같다
        if self.opts.polar_out && radius == 1 {
            let proj = annulus::polar_projection(&ws.grid);
            let fname = Path::new(&rec.name)
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| rec.name.clone());
            let out = format!("P_{}", fname);
            if let Err(e) = fits::write(&out, &proj, true, PROGRAM_TAG, VERSION_TAG) {
                warn!("투영 이미지 기록 실패 {}: {}", out, e);
            }
        }

        debug!("2DFFT 계산: 반경 {}", radius);
        self.engine.forward(ws);

        let out_dir = PathBuf::from(&rec.result);
        let radius_echo = (width / 2) as i64;
        let mut records_arr = [RadiusAnalysis::nan(); NUM_MODES];
        let mut write_failures = 0usize;

        for mode in M_INI..=M_FIN {
            let mut spec = ModeSpectrum::extract(&ws.grid, mode, norma);

            // 합산은 필터가 걸리기 전의 진폭으로 들어간다
            for (bin, jm) in (FREQ_LO_INDEX..=FREQ_HI_INDEX).enumerate() {
                summed.add(mode, bin, spec.abs(jm));
            }

            if self.opts.high_pass {
                let cutoff = mode as f64 * STEP_P;
                for jm in FREQ_LO_INDEX..=FREQ_HI_INDEX {
                    let freq = bin_frequency(jm);
                    if freq < cutoff && freq > -cutoff {
                        spec.zero_bin(jm);
                    }
                }
            }

            // 반경 단위 기록 실패는 그 반경 기여만 빠지고 루프는 계속
            let rip = records::rip_path(&out_dir, &rec.keyword, radius, mode);
            if let Err(e) = records::write_rip(&rip, radius_echo, norma, &spec) {
                warn!("{}", e);
                write_failures += 1;
            }
            let dat = records::dat_path(&out_dir, &rec.keyword, radius, mode);
            if let Err(e) = records::write_dat(&dat, &spec) {
                warn!("{}", e);
                write_failures += 1;
            }

            let (analysis, state) = analyze(&spec, mode);
            if self.opts.warn_computation {
                match state {
                    AnalysisState::Complete => {}
                    AnalysisState::NoSignal => {
                        debug!("신호 없음: 반경 {} 모드 {}", radius, mode);
                    }
                    AnalysisState::Failed { stage, error } => {
                        warn!("분석 실패 ({:?}/{:?}): 반경 {} 모드 {}", stage, error, radius, mode);
                    }
                }
            }
            records_arr[mode - M_INI] = analysis;
        }

        RadiusRow { radius, records: records_arr, write_failures }
    }
}
