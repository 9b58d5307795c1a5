//! 역변환 재구성 CLI
//!
//! forward 파이프라인이 남긴 반경별 .rip 레코드를 반경 범위에 걸쳐
//! 합산해 역방향 2D FFT를 돌리고, 선택한 모드들만으로 재구성한
//! 이미지를 만든다. 바깥 10% 반경은 퇴화 샘플이 많아 기본 범위에서
//! 제외된다

use std::path::Path;
use std::process;

use clap::{Arg, ArgAction, Command};
use log::{info, warn, LevelFilter};

use spiral2dfft::core::pipeline::{PROGRAM_TAG, VERSION_TAG};
use spiral2dfft::core::reconstruct::{accumulate_record, reconstruct};
use spiral2dfft::core::transform::SpectralEngine;
use spiral2dfft::core::types::{M_FIN, M_INI, MAX_AXIS};
use spiral2dfft::io::manifest::{self, InverseJob};
use spiral2dfft::io::{fits, records};

/// 출력 파일 이름: 베이스의 디렉토리는 유지하고 파일명에만 접두어
fn output_name(base: &str, mode_tag: Option<&str>) -> String {
    let path = Path::new(base);
    let stem = path.file_name().map(|f| f.to_string_lossy().into_owned()).unwrap_or_default();
    let name = match mode_tag {
        Some(tag) => format!("I_{}_{}.fits", tag, stem),
        None => format!("I_{}.fits", stem),
    };
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            parent.join(name).to_string_lossy().into_owned()
        }
        _ => name,
    }
}

fn main() {
    let matches = Command::new("spiral_ifft")
        .version("0.1.0")
        .about("저장된 반경별 스펙트럼에서 나선 구조를 역변환 재구성")
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::SetTrue)
                .help("진행 상황 메시지 출력"),
        )
        .arg(Arg::new("start").long("start").short('s').value_name("R").help("시작 반경"))
        .arg(Arg::new("end").long("end").short('e').value_name("R").help("끝 반경"))
        .arg(
            Arg::new("mode")
                .long("mode")
                .short('m')
                .value_name("N[,N...]")
                .help("재구성에 쓸 모드 목록 (기본 1-6)"),
        )
        .arg(
            Arg::new("input")
                .long("input")
                .short('i')
                .value_name("FILE")
                .help("작업 매니페스트 (베이스[,모드[,시작[,끝]]])"),
        )
        .arg(Arg::new("bases").num_args(0..).help("forward 결과 접두어들"))
        .get_matches();

    env_logger::Builder::from_default_env()
        .filter_level(if matches.get_flag("verbose") { LevelFilter::Info } else { LevelFilter::Warn })
        .init();

    // 반경 범위 인자 검증 (시작 불능 오류)
    let cli_start: Option<u32> = matches.get_one::<String>("start").map(|s| match s.parse() {
        Ok(v) if v >= 1 && (v as usize) <= MAX_AXIS => v,
        _ => {
            eprintln!("ERROR: 시작 반경이 유효하지 않음: {}", s);
            process::exit(1);
        }
    });
    let cli_end: Option<u32> = matches.get_one::<String>("end").map(|s| match s.parse() {
        Ok(v) if v >= 1 && (v as usize) <= MAX_AXIS => v,
        _ => {
            eprintln!("ERROR: 끝 반경이 유효하지 않음: {}", s);
            process::exit(1);
        }
    });
    if let (Some(s), Some(e)) = (cli_start, cli_end) {
        if e < s {
            eprintln!("ERROR: 반경 범위 {}..{}가 유효하지 않음", s, e);
            process::exit(1);
        }
    }

    let cli_modes = matches.get_one::<String>("mode").map(|s| {
        manifest::parse_mode_string(s).unwrap_or_else(|e| {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        })
    });

    // 작업 목록: 매니페스트 또는 명령행 베이스들
    let mut jobs: Vec<InverseJob> = if let Some(input) = matches.get_one::<String>("input") {
        match manifest::read_inverse_lines(input) {
            Ok(jobs) if !jobs.is_empty() => jobs,
            Ok(_) => {
                eprintln!("ERROR: 매니페스트에 유효한 항목이 없음: {}", input);
                process::exit(1);
            }
            Err(e) => {
                eprintln!("ERROR: {}", e);
                process::exit(1);
            }
        }
    } else {
        let bases: Vec<&String> =
            matches.get_many::<String>("bases").map(|v| v.collect()).unwrap_or_default();
        if bases.is_empty() {
            eprintln!("ERROR: 처리할 파일이 지정되지 않음");
            process::exit(1);
        }
        bases.iter().map(|b| InverseJob::new(b.to_string())).collect()
    };

    // 명령행 -m/-s/-e는 모든 작업에 덮어쓴다
    let explicit_modes = cli_modes.is_some() || matches.get_one::<String>("input").is_some();
    for job in jobs.iter_mut() {
        if let Some(modes) = cli_modes {
            job.modes = modes;
        }
        if cli_start.is_some() {
            job.start = cli_start;
        }
        if cli_end.is_some() {
            job.end = cli_end;
        }
        // 편의상 .fits 접미사는 떼 준다
        if let Some(stripped) = job.base.strip_suffix(".fits") {
            job.base = stripped.to_string();
        }
    }

    let engine = SpectralEngine::new();
    let mut err_cnt = 0usize;
    let total = jobs.len();

    for job in &jobs {
        info!("처리 시작: {}", job.base);

        // 최대 반경은 모드 1 요약 파일의 마지막 행에서 복원
        let summary = format!("{}_m1", job.base);
        let maxrad = match records::max_radius_from_summary(Path::new(&summary)) {
            Ok(r) => r,
            Err(e) => {
                warn!("반경을 알 수 없음 ({}), 건너뜀: {:#}", summary, e);
                err_cnt += 1;
                continue;
            }
        };

        // 바깥 10% 고리는 퇴화 샘플이라 기본 상한은 90% 지점
        let maxrad90 = (maxrad as f32 * 0.9) as u32;
        if maxrad90 < 1 || (maxrad as usize) > MAX_AXIS / 2 {
            warn!("반경 {}이 비정상, 건너뜀: {}", maxrad, job.base);
            err_cnt += 1;
            continue;
        }

        let begin = job.start.unwrap_or(1);
        let finish = match job.end {
            Some(e) if e > maxrad90 => {
                warn!("끝 반경이 90% 지점을 넘어 {}로 줄임: {}", maxrad90, job.base);
                maxrad90
            }
            Some(e) => e,
            None => maxrad90,
        };
        if begin > finish {
            warn!("반경 범위 {}..{}가 유효하지 않음, 건너뜀: {}", begin, finish, job.base);
            err_cnt += 1;
            continue;
        }

        if !Path::new(&job.base).is_dir() {
            warn!("레코드 디렉토리가 없음, 건너뜀: {}", job.base);
            err_cnt += 1;
            continue;
        }
        info!("{}: 반경 {}..{} (관측 최대 {})", job.base, begin, finish, maxrad);

        // 반경 범위의 레코드를 모드 블록에 합산
        let mut ws = engine.make_workspace();
        ws.reset();
        for radius in begin..=finish {
            for mode in M_INI..=M_FIN {
                if !job.modes[mode] {
                    continue;
                }
                let rip_file = records::rip_path(
                    Path::new(&job.base),
                    manifest::DEFAULT_KEYWORD,
                    radius,
                    mode,
                );
                let rip = match records::read_rip(&rip_file) {
                    Ok(r) => r,
                    Err(e) => {
                        warn!("레코드 없음, 건너뜀: {:#}", e);
                        continue;
                    }
                };
                if !records::rip_count_ok(&rip) {
                    info!(
                        "레코드 값 개수가 규정과 다름 ({}): {}",
                        rip.values.len(),
                        rip_file.display()
                    );
                }
                accumulate_record(&mut ws.grid, mode, &rip);
            }
        }

        let image = reconstruct(&engine, &mut ws, maxrad, finish);

        let tag = job.mode_tag();
        let outfile = output_name(&job.base, if explicit_modes { Some(tag.as_str()) } else { None });
        match fits::write(&outfile, &image, true, PROGRAM_TAG, VERSION_TAG) {
            Ok(()) => info!("재구성 기록: {}", outfile),
            Err(e) => {
                warn!("재구성 기록 실패 {}: {}", outfile, e);
                err_cnt += 1;
            }
        }
    }

    println!("-------------------------------");
    println!("성공적으로 처리됨        {}", total - err_cnt.min(total));
    println!("오류                     {}", err_cnt);
    process::exit(0);
}
