//! 입력 매니페스트 해석
//!
//! forward 파이프라인: `이미지[,결과접두어[,반경]]` 한 줄에 하나.
//! inverse 도구: `베이스[,모드문자열[,시작[,끝]]]`.
//! `#` 주석과 빈 줄은 무시한다. 빠진 필드는 나중에 파이프라인이
//! 이미지 크기에서 다시 유도함

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::warn;

use crate::core::types::{FileRec, M_FIN, M_INI, NUM_MODES};
use crate::io::fits;

/// 중간 파일 접두어 기본값
pub const DEFAULT_KEYWORD: &str = "outi";

/// 경로에서 확장자를 뗀 이름. 마지막 점이 경로 구분자보다 앞이면
/// (디렉토리 이름의 점) 그대로 둔다
pub fn remove_extension(name: &str) -> String {
    match name.rfind('.') {
        Some(dot) => {
            if let Some(slash) = name.rfind('/') {
                if slash > dot {
                    return name.to_string();
                }
            }
            name[..dot].to_string()
        }
        None => name.to_string(),
    }
}

/// 명령행 인자 하나를 입력 레코드로. 파일 형식은 매직 워드로 판별
pub fn rec_from_arg(name: &str) -> Result<FileRec> {
    let binary = fits::is_binary(name).with_context(|| format!("파일 확인 실패: {}", name))?;
    Ok(FileRec {
        name: name.to_string(),
        result: remove_extension(name),
        keyword: DEFAULT_KEYWORD.to_string(),
        radius: None,
        binary,
    })
}

/// forward 매니페스트 파일을 읽어 입력 레코드 목록을 만든다
///
/// 존재하지 않는 이미지나 형식이 깨진 줄은 경고 후 건너뛴다
pub fn read_lines(path: impl AsRef<Path>) -> Result<Vec<FileRec>> {
    let file = File::open(&path)
        .with_context(|| format!("매니페스트 열기 실패: {}", path.as_ref().display()))?;
    let reader = BufReader::new(file);
    let mut items = Vec::new();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.split(',').map(str::trim);
        let name = match fields.next() {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => {
                warn!("{}행: 파일 이름 없음", lineno + 1);
                continue;
            }
        };

        if !Path::new(&name).exists() {
            warn!("{}행: 파일 없음 {}", lineno + 1, name);
            continue;
        }

        let result = match fields.next() {
            Some(r) if !r.is_empty() => r.to_string(),
            _ => remove_extension(&name),
        };
        let radius = match fields.next() {
            Some(r) if !r.is_empty() => match r.parse::<u32>() {
                Ok(v) if v >= 1 => Some(v),
                _ => {
                    warn!("{}행: 반경 값이 이상함 '{}', 크기에서 다시 계산", lineno + 1, r);
                    None
                }
            },
            _ => None,
        };

        let binary = fits::is_binary(&name)?;
        items.push(FileRec { name, result, keyword: DEFAULT_KEYWORD.to_string(), radius, binary });
    }

    Ok(items)
}

/// inverse 도구의 작업 단위
#[derive(Debug, Clone)]
pub struct InverseJob {
    /// 결과 접두어 (forward가 만든 디렉토리/요약 파일 이름)
    pub base: String,
    /// 모드별 선택 여부 (인덱스 = 모드)
    pub modes: [bool; NUM_MODES],
    /// 시작 반경 (없으면 1)
    pub start: Option<u32>,
    /// 끝 반경 (없으면 관측 최대의 90%)
    pub end: Option<u32>,
}

impl InverseJob {
    pub fn new(base: String) -> Self {
        // 기본 선택은 모드 1..=M_FIN (모드 0은 대칭 성분이라 제외)
        let mut modes = [false; NUM_MODES];
        for m in modes.iter_mut().skip(1) {
            *m = true;
        }
        Self { base, modes, start: None, end: None }
    }

    /// 선택된 모드들의 이름 조각 ("I_246_..." 식 출력 이름에 쓰임)
    pub fn mode_tag(&self) -> String {
        self.modes
            .iter()
            .enumerate()
            .filter(|(_, &on)| on)
            .map(|(m, _)| m.to_string())
            .collect()
    }
}

/// "123456" 같은 모드 문자열을 선택 배열로
pub fn parse_mode_string(s: &str) -> Result<[bool; NUM_MODES]> {
    let mut modes = [false; NUM_MODES];
    for c in s.chars().filter(|c| !c.is_whitespace() && *c != ',') {
        let m = c
            .to_digit(10)
            .map(|d| d as usize)
            .filter(|&d| (M_INI..=M_FIN).contains(&d));
        match m {
            Some(d) => modes[d] = true,
            None => bail!("알 수 없는 모드: {}", c),
        }
    }
    if modes.iter().all(|&on| !on) {
        bail!("선택된 모드가 없음: {}", s);
    }
    Ok(modes)
}

/// inverse 매니페스트 읽기
pub fn read_inverse_lines(path: impl AsRef<Path>) -> Result<Vec<InverseJob>> {
    let file = File::open(&path)
        .with_context(|| format!("매니페스트 열기 실패: {}", path.as_ref().display()))?;
    let reader = BufReader::new(file);
    let mut jobs = Vec::new();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.split([',', '\t', ' ']).filter(|f| !f.is_empty());
        let base = match fields.next() {
            Some(b) => b.to_string(),
            None => continue,
        };
        let mut job = InverseJob::new(base);

        if let Some(modes) = fields.next() {
            match parse_mode_string(modes) {
                Ok(m) => job.modes = m,
                Err(e) => {
                    warn!("{}행: {}", lineno + 1, e);
                    continue;
                }
            }
        }
        if let Some(start) = fields.next() {
            match start.parse::<u32>() {
                Ok(v) if v >= 1 => job.start = Some(v),
                _ => {
                    warn!("{}행: 시작 반경이 이상함 '{}'", lineno + 1, start);
                    continue;
                }
            }
        }
        if let Some(end) = fields.next() {
            match end.parse::<u32>() {
                Ok(v) if v >= 1 => job.end = Some(v),
                _ => {
                    warn!("{}행: 끝 반경이 이상함 '{}'", lineno + 1, end);
                    continue;
                }
            }
        }
        jobs.push(job);
    }

    Ok(jobs)
}
