//! 반경별 중간 레코드 파일과 요약 파일
//!
//! .rip 파일: 헤더 두 줄(반경 에코, 정규화 값) 뒤에 기록 구간 빈마다
//! 실수부 한 줄, 허수부 한 줄. .dat 파일: 빈마다 "주파수 진폭" 한 줄.
//! 과거 데이터셋을 역변환기와 요약 도구가 다시 읽으므로 숫자 표기는
//! C의 %e/%f 형식과 같아야 한다

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::core::transform::spectrum::{bin_frequency, ModeSpectrum};
use crate::core::types::{ModeRadiusMap, RipRecord, FREQ_BINS, FREQ_HI_INDEX, FREQ_LO_INDEX};

/// C printf의 %e와 같은 표기 (가수 6자리, 지수 부호 + 최소 2자리)
pub fn fmt_e(v: f64) -> String {
    if v.is_nan() {
        return if v.is_sign_negative() { "-nan".into() } else { "nan".into() };
    }
    if v.is_infinite() {
        return if v < 0.0 { "-inf".into() } else { "inf".into() };
    }
    // "1.234567e5" -> "1.234567e+05"
    let base = format!("{:.6e}", v);
    match base.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            format!("{}e{}{:02}", mantissa, if exp < 0 { '-' } else { '+' }, exp.abs())
        }
        None => base,
    }
}

/// 중간 파일 이름 규약: `<keyword><radius>_m<mode>` + 확장자
pub fn rip_path(dir: &Path, keyword: &str, radius: u32, mode: usize) -> PathBuf {
    dir.join(format!("{}{}_m{}.rip", keyword, radius, mode))
}

pub fn dat_path(dir: &Path, keyword: &str, radius: u32, mode: usize) -> PathBuf {
    dir.join(format!("{}{}_m{}.dat", keyword, radius, mode))
}

/// 요약 행의 레코드 라벨
pub fn record_label(keyword: &str, radius: u32, mode: usize) -> String {
    format!("{}{}_m{}", keyword, radius, mode)
}

/// .rip 파일 기록. 한 반경의 한 모드가 완결된 단위로 쓰인다
pub fn write_rip(
    path: &Path,
    radius_echo: i64,
    norma: f64,
    spec: &ModeSpectrum,
) -> Result<()> {
    let file = File::create(path).with_context(|| format!("rip 파일 생성 실패: {}", path.display()))?;
    let mut w = BufWriter::new(file);
    writeln!(w, "{}", radius_echo)?;
    writeln!(w, "{}", fmt_e(norma))?;
    for jm in FREQ_LO_INDEX..=FREQ_HI_INDEX {
        writeln!(w, "{}", fmt_e(spec.real(jm)))?;
        writeln!(w, "{}", fmt_e(spec.imag(jm)))?;
    }
    w.flush()?;
    Ok(())
}

/// .dat 파일 기록 (주파수, 진폭)
pub fn write_dat(path: &Path, spec: &ModeSpectrum) -> Result<()> {
    let file = File::create(path).with_context(|| format!("dat 파일 생성 실패: {}", path.display()))?;
    let mut w = BufWriter::new(file);
    for jm in FREQ_LO_INDEX..=FREQ_HI_INDEX {
        writeln!(w, "{:.6} {}", bin_frequency(jm), fmt_e(spec.abs(jm)))?;
    }
    w.flush()?;
    Ok(())
}

/// .rip 파일 읽기. 값 개수가 규정(FREQ_BINS * 2)과 달라도 읽은 만큼
/// 돌려준다 (호출자가 경고)
pub fn read_rip(path: &Path) -> Result<RipRecord> {
    let file = File::open(path).with_context(|| format!("rip 파일 열기 실패: {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut tokens = Vec::new();
    for line in reader.lines() {
        let line = line?;
        for tok in line.split_whitespace() {
            tokens.push(tok.to_string());
        }
    }
    if tokens.len() < 2 {
        bail!("rip 파일 헤더가 불완전함: {}", path.display());
    }

    let radius_echo: i64 =
        tokens[0].parse().with_context(|| format!("반경 에코 해석 실패: {}", tokens[0]))?;
    let norma: f64 =
        tokens[1].parse().with_context(|| format!("정규화 값 해석 실패: {}", tokens[1]))?;
    let values = tokens[2..]
        .iter()
        .map(|t| t.parse::<f64>().with_context(|| format!("스펙트럼 값 해석 실패: {}", t)))
        .collect::<Result<Vec<f64>>>()?;

    Ok(RipRecord { radius_echo, norma, values })
}

/// 반경 하나의 rip 값 개수가 규정에 맞는지
pub fn rip_count_ok(rec: &RipRecord) -> bool {
    rec.values.len() == FREQ_BINS * 2
}

/// 모드 하나의 요약 파일 (`<result>_m<mode>`): 반경마다 고정 폭 한 줄
pub fn write_mode_summary(
    path: &Path,
    mode: usize,
    keyword: &str,
    map: &ModeRadiusMap,
) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("요약 파일 생성 실패: {}", path.display()))?;
    let mut w = BufWriter::new(file);
    for radius in 1..=map.max_radius() {
        let rec = map.get(mode, radius);
        writeln!(
            w,
            "{:6}{:>11}{:8.2}{:12.3}{:9.2}{:11.3}{:11.3}{:11.3}",
            mode,
            record_label(keyword, radius, mode),
            rec.freq,
            rec.amp,
            rec.pa,
            rec.phase,
            rec.snr,
            rec.fwhm,
        )?;
    }
    w.flush()?;
    Ok(())
}

/// 모드 하나의 합산 스펙트럼 파일 (`<result>_sum_m<mode>`)
pub fn write_sum_summary(path: &Path, rows: &[(f64, f64)]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("합산 파일 생성 실패: {}", path.display()))?;
    let mut w = BufWriter::new(file);
    for (freq, amp) in rows {
        writeln!(w, "{:6.2}     {:.6}", freq, amp)?;
    }
    w.flush()?;
    Ok(())
}

/// 모드 요약 파일의 마지막 행 라벨에서 최대 반경을 복원한다
///
/// 행 형식은 `write_mode_summary`가 쓰는 고정 폭, 라벨은
/// `<keyword><radius>_m<mode>`. 역변환기가 반경 범위를 정할 때 사용
pub fn max_radius_from_summary(path: &Path) -> Result<u32> {
    let file =
        File::open(path).with_context(|| format!("요약 파일 열기 실패: {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut last_label: Option<String> = None;
    for line in reader.lines() {
        let line = line?;
        if let Some(label) = line.split_whitespace().nth(1) {
            last_label = Some(label.to_string());
        }
    }
    let label = match last_label {
        Some(l) => l,
        None => bail!("요약 파일에 유효한 행이 없음: {}", path.display()),
    };

    // "<keyword><radius>_m<mode>"에서 radius만
    let stem = match label.rfind("_m") {
        Some(pos) => &label[..pos],
        None => bail!("라벨 형식이 아님: {}", label),
    };
    let digits: String =
        stem.chars().rev().take_while(|c| c.is_ascii_digit()).collect::<Vec<_>>().into_iter().rev().collect();
    if digits.is_empty() {
        bail!("라벨에서 반경을 못 찾음: {}", label);
    }
    Ok(digits.parse()?)
}
