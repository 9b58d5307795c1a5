//! forward 파이프라인 CLI
//!
//! 이미지 목록(명령행 인자, 매니페스트 파일, 또는 구식 표준 입력)을
//! 받아 반경별 2D FFT 분석을 수행한다. 개별 이미지 실패는 세기만 하고
//! 계속 진행하며, 시작 자체가 불가능할 때만 0이 아닌 코드로 종료한다

use std::io::Read;
use std::path::Path;
use std::process;

use clap::{Arg, ArgAction, Command};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn, LevelFilter};

use spiral2dfft::core::mapping::RadialPolicy;
use spiral2dfft::core::pipeline::{Pipeline, RunOptions, RunSummary};
use spiral2dfft::core::types::{FileRec, MAX_WINDOW, MIN_WINDOW};
use spiral2dfft::io::manifest;

/// 구식 표준 입력 형식: 이름/결과/키워드/반경 네 토큰
fn read_std_input() -> Option<FileRec> {
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf).ok()?;
    let mut tokens = buf.split_whitespace();

    let name = loop {
        match tokens.next() {
            Some(tok) if Path::new(tok).exists() => break tok.to_string(),
            Some(tok) => {
                warn!("파일 없음: {}", tok);
                continue;
            }
            None => {
                eprintln!("ERROR: 표준 입력에서 이미지 파일을 찾지 못함");
                return None;
            }
        }
    };
    let result = tokens.next()?.to_string();
    let keyword = tokens.next()?.to_string();
    let radius: u32 = tokens.next()?.parse().ok()?;

    let binary = manifest::rec_from_arg(&name).ok()?.binary;
    Some(FileRec { name, result, keyword, radius: Some(radius), binary })
}

fn main() {
    let matches = Command::new("spiral2dfft")
        .version("0.1.0")
        .about("나선은하 팔 피치 각 2D FFT 분석 도구")
        .arg(
            Arg::new("input")
                .long("input")
                .short('i')
                .value_name("FILE")
                .help("이미지 목록 매니페스트 (이름[,결과[,반경]])"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::SetTrue)
                .help("진행 상황 메시지 출력"),
        )
        .arg(
            Arg::new("warn")
                .long("warn")
                .short('w')
                .action(ArgAction::SetTrue)
                .help("계산 단계의 비정상 값 경고 출력 (느려짐)"),
        )
        .arg(
            Arg::new("reverse")
                .long("reverse")
                .short('r')
                .action(ArgAction::SetTrue)
                .help("바깥 반경이 줄어드는 역방향 환형 고리 사용"),
        )
        .arg(
            Arg::new("fixed")
                .long("fixed")
                .short('f')
                .value_name("SIZE")
                .help("고정 폭 환형 고리 사용 (폭 지정)"),
        )
        .arg(
            Arg::new("polar")
                .long("polar")
                .short('p')
                .action(ArgAction::SetTrue)
                .help("로그-극좌표 투영 이미지 파일 생성"),
        )
        .arg(
            Arg::new("zero")
                .long("zero")
                .short('z')
                .action(ArgAction::SetTrue)
                .help("FFT 윈도우를 흉내내는 가장자리 0 패딩"),
        )
        .arg(
            Arg::new("mask")
                .long("mask")
                .short('m')
                .value_name("0|1")
                .help("밝은 값 마스킹: 0 = 중심값 이상 제거, 1 = 막대 반경 안쪽 제거"),
        )
        .arg(
            Arg::new("highpass")
                .long("highpass")
                .action(ArgAction::SetTrue)
                .help("기록 전 저주파 빈 제거 (실험적)"),
        )
        .arg(
            Arg::new("json-summary")
                .long("json-summary")
                .value_name("FILE")
                .help("실행 요약을 JSON으로 기록"),
        )
        .arg(Arg::new("files").num_args(0..).help("처리할 이미지 파일들"))
        .get_matches();

    let verbose = matches.get_flag("verbose");
    env_logger::Builder::from_default_env()
        .filter_level(if verbose { LevelFilter::Info } else { LevelFilter::Warn })
        .init();

    // 충돌/범위 검증 (시작 불능 오류)
    let fixed: Option<u32> = match matches.get_one::<String>("fixed") {
        Some(s) => match s.parse::<u32>() {
            Ok(v) if (MIN_WINDOW..=MAX_WINDOW).contains(&v) => Some(v),
            _ => {
                eprintln!("ERROR: 고리 폭은 {}에서 {} 사이여야 함", MIN_WINDOW, MAX_WINDOW);
                process::exit(1);
            }
        },
        None => None,
    };
    let reverse = matches.get_flag("reverse");
    if fixed.is_some() && reverse {
        eprintln!("ERROR: --reverse와 --fixed는 함께 쓸 수 없음");
        process::exit(1);
    }

    let (core_mask, bar_mask) = match matches.get_one::<String>("mask").map(String::as_str) {
        Some("0") => (true, false),
        Some(_) => (false, true),
        None => (false, false),
    };

    let policy = if reverse {
        RadialPolicy::Reverse
    } else if let Some(width) = fixed {
        RadialPolicy::FixedWindow { width }
    } else {
        RadialPolicy::Standard
    };

    let opts = RunOptions {
        policy,
        core_mask,
        bar_mask,
        edge_zero: matches.get_flag("zero"),
        high_pass: matches.get_flag("highpass"),
        polar_out: matches.get_flag("polar"),
        warn_computation: matches.get_flag("warn"),
    };

    // 입력 수집: 매니페스트 > 명령행 인자 > 표준 입력
    let items: Vec<FileRec> = if let Some(input) = matches.get_one::<String>("input") {
        match manifest::read_lines(input) {
            Ok(items) if !items.is_empty() => items,
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
        let args: Vec<&String> =
            matches.get_many::<String>("files").map(|v| v.collect()).unwrap_or_default();
        if args.is_empty() {
            match read_std_input() {
                Some(rec) => vec![rec],
                None => process::exit(1),
            }
        } else {
            args.iter()
                .filter_map(|name| {
                    if Path::new(name.as_str()).exists() {
                        manifest::rec_from_arg(name.as_str()).map_err(|e| warn!("{}", e)).ok()
                    } else {
                        warn!("파일 없음: {}", name);
                        None
                    }
                })
                .collect()
        }
    };

    if items.is_empty() {
        eprintln!("ERROR: 처리할 파일이 없음 (작업 목록이 비었음)");
        process::exit(1);
    }
    println!("처리할 파일 수:    {}", items.len());
    info!("워커 {}개로 반경 루프를 병렬 실행", num_cpus::get());

    // FFT 플랜은 전체 실행에서 한 번만 만든다
    let pipeline = Pipeline::new(opts);

    let bar = ProgressBar::new(items.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}").expect("진행 막대 템플릿"),
    );

    let mut reports = Vec::new();
    let mut proc_error = 0usize;
    for rec in &items {
        bar.set_message(rec.name.clone());
        match pipeline.process_image(rec) {
            Ok(report) => reports.push(report),
            Err(e) => {
                warn!("건너뜀 {}: {:#}", rec.name, e);
                proc_error += 1;
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    let summary = RunSummary {
        attempted: items.len(),
        succeeded: items.len() - proc_error,
        errored: proc_error,
    };
    println!("-------------------------------");
    println!("성공적으로 처리됨        {}", summary.succeeded);
    println!("오류                     {}", summary.errored);

    if let Some(path) = matches.get_one::<String>("json-summary") {
        let body = serde_json::json!({ "summary": summary, "images": reports });
        match serde_json::to_string_pretty(&body) {
            Ok(text) => {
                if let Err(e) = std::fs::write(path, text) {
                    warn!("JSON 요약 기록 실패 {}: {}", path, e);
                }
            }
            Err(e) => warn!("JSON 직렬화 실패: {}", e),
        }
    }

    // 개별 이미지 실패가 있어도 완주했으면 0으로 끝난다
    process::exit(0);
}
