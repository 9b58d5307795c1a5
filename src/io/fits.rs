//! FITS 계열 이미지 파일 입출력
//!
//! 파이프라인이 쓰는 부분집합만 구현한다: 2차원 1-HDU 이미지, 고정
//! 80자 카드 헤더, 빅엔디안 픽셀 데이터. 파일 포맷은 첫 축(x)이 가장
//! 빨리 도는 순서라서 `PixelGrid`의 내부 배치와 그대로 일치한다.
//! ASCII 텍스트 격자 읽기도 여기서 담당

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use chrono::Utc;
use thiserror::Error;

use crate::core::types::{GridLayout, PixelGrid, MAX_AXIS};

/// 헤더/데이터 블록 크기
const BLOCK: usize = 2880;
/// 카드 한 장의 길이
const CARD: usize = 80;

/// 이미지 파일 오류 분류
#[derive(Debug, Error)]
pub enum FitsError {
    #[error("파일을 열 수 없음: {0}")]
    Open(#[source] std::io::Error),
    #[error("파일을 만들 수 없음: {0}")]
    Create(#[source] std::io::Error),
    #[error("헤더 해석 실패: {0}")]
    Header(String),
    #[error("이미지 크기가 허용 범위 밖: {0} x {1}")]
    Size(usize, usize),
    #[error("픽셀 데이터 읽기 실패: {0}")]
    Read(#[source] std::io::Error),
    #[error("픽셀 데이터 쓰기 실패: {0}")]
    Write(#[source] std::io::Error),
    #[error("파일 마무리 실패: {0}")]
    Close(#[source] std::io::Error),
}

struct Header {
    bitpix: i32,
    width: usize,
    height: usize,
    bscale: f64,
    bzero: f64,
}

fn parse_card_value(card: &str) -> Option<&str> {
    // "KEY     = value / comment" 형태에서 value만
    let (_, rest) = card.split_at(10.min(card.len()));
    let value = match rest.find('/') {
        Some(pos) => &rest[..pos],
        None => rest,
    };
    Some(value.trim())
}

fn read_header(file: &mut impl Read) -> Result<Header, FitsError> {
    let mut bitpix = None;
    let mut naxis = None;
    let mut naxis1 = None;
    let mut naxis2 = None;
    let mut bscale = 1.0f64;
    let mut bzero = 0.0f64;
    let mut simple = false;

    'blocks: loop {
        let mut block = [0u8; BLOCK];
        file.read_exact(&mut block).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                FitsError::Header("END 카드 전에 파일이 끝남".into())
            } else {
                FitsError::Read(e)
            }
        })?;

        for card_bytes in block.chunks(CARD) {
            let card = String::from_utf8_lossy(card_bytes);
            let key = card[..8.min(card.len())].trim_end().to_string();
            match key.as_str() {
                "END" => break 'blocks,
                "SIMPLE" => {
                    simple = parse_card_value(&card).map(|v| v.starts_with('T')).unwrap_or(false);
                }
                "BITPIX" => {
                    bitpix = parse_card_value(&card).and_then(|v| v.parse::<i32>().ok());
                }
                "NAXIS" => {
                    naxis = parse_card_value(&card).and_then(|v| v.parse::<usize>().ok());
                }
                "NAXIS1" => {
                    naxis1 = parse_card_value(&card).and_then(|v| v.parse::<usize>().ok());
                }
                "NAXIS2" => {
                    naxis2 = parse_card_value(&card).and_then(|v| v.parse::<usize>().ok());
                }
                "BSCALE" => {
                    bscale = parse_card_value(&card).and_then(|v| v.parse::<f64>().ok()).unwrap_or(1.0);
                }
                "BZERO" => {
                    bzero = parse_card_value(&card).and_then(|v| v.parse::<f64>().ok()).unwrap_or(0.0);
                }
                _ => {}
            }
        }
    }

    if !simple {
        return Err(FitsError::Header("SIMPLE 카드가 없거나 T가 아님".into()));
    }
    let bitpix = bitpix.ok_or_else(|| FitsError::Header("BITPIX 없음".into()))?;
    let naxis = naxis.ok_or_else(|| FitsError::Header("NAXIS 없음".into()))?;
    if naxis < 2 {
        return Err(FitsError::Header(format!("2차원 이미지가 아님 (NAXIS={})", naxis)));
    }
    let width = naxis1.ok_or_else(|| FitsError::Header("NAXIS1 없음".into()))?;
    let height = naxis2.ok_or_else(|| FitsError::Header("NAXIS2 없음".into()))?;
    if width == 0 || height == 0 || width > MAX_AXIS || height > MAX_AXIS {
        return Err(FitsError::Size(width, height));
    }

    Ok(Header { bitpix, width, height, bscale, bzero })
}

/// 픽셀 데이터 없이 크기만 읽는다
pub fn read_dims(path: impl AsRef<Path>) -> Result<(usize, usize), FitsError> {
    let file = File::open(path).map_err(FitsError::Open)?;
    let mut reader = BufReader::new(file);
    let hdr = read_header(&mut reader)?;
    Ok((hdr.width, hdr.height))
}

/// 바이너리 이미지 파일을 읽어 픽셀 격자로 돌려준다
pub fn read(path: impl AsRef<Path>) -> Result<PixelGrid, FitsError> {
    let file = File::open(path).map_err(FitsError::Open)?;
    let mut reader = BufReader::new(file);
    let hdr = read_header(&mut reader)?;

    let count = hdr.width * hdr.height;
    let sample_bytes = (hdr.bitpix.unsigned_abs() as usize) / 8;
    let mut raw = vec![0u8; count * sample_bytes];
    reader.read_exact(&mut raw).map_err(FitsError::Read)?;

    let mut data = Vec::with_capacity(count);
    match hdr.bitpix {
        -32 => {
            for chunk in raw.chunks_exact(4) {
                data.push(BigEndian::read_f32(chunk));
            }
        }
        -64 => {
            for chunk in raw.chunks_exact(8) {
                data.push(BigEndian::read_f64(chunk) as f32);
            }
        }
        8 => {
            for &b in &raw {
                data.push((f64::from(b) * hdr.bscale + hdr.bzero) as f32);
            }
        }
        16 => {
            for chunk in raw.chunks_exact(2) {
                let v = BigEndian::read_i16(chunk);
                data.push((f64::from(v) * hdr.bscale + hdr.bzero) as f32);
            }
        }
        32 => {
            for chunk in raw.chunks_exact(4) {
                let v = BigEndian::read_i32(chunk);
                data.push((f64::from(v) * hdr.bscale + hdr.bzero) as f32);
            }
        }
        other => {
            return Err(FitsError::Header(format!("지원하지 않는 BITPIX: {}", other)));
        }
    }

    Ok(PixelGrid::from_vec(data, hdr.width, hdr.height, GridLayout::XFastest))
}

fn push_card(header: &mut Vec<u8>, text: &str) {
    let mut card = text.as_bytes().to_vec();
    card.resize(CARD, b' ');
    header.extend_from_slice(&card[..CARD]);
}

fn pad_block(buf: &mut Vec<u8>, fill: u8) {
    while buf.len() % BLOCK != 0 {
        buf.push(fill);
    }
}

/// 픽셀 격자를 32비트 부동소수점 이미지로 기록한다
///
/// `overwrite`가 거짓인데 파일이 이미 있으면 Create 오류.
/// 크기가 허용 범위를 벗어나면 Size 오류
pub fn write(
    path: impl AsRef<Path>,
    grid: &PixelGrid,
    overwrite: bool,
    program: &str,
    version: &str,
) -> Result<(), FitsError> {
    let (w, h) = (grid.width(), grid.height());
    if w == 0 || h == 0 || w > MAX_AXIS || h > MAX_AXIS {
        return Err(FitsError::Size(w, h));
    }

    let file = if overwrite {
        File::create(&path).map_err(FitsError::Create)?
    } else {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(FitsError::Create)?
    };
    let mut writer = BufWriter::new(file);

    let mut header = Vec::with_capacity(BLOCK);
    push_card(&mut header, "SIMPLE  =                    T / conforms to FITS standard");
    push_card(&mut header, "BITPIX  =                  -32 / 32-bit IEEE float");
    push_card(&mut header, "NAXIS   =                    2");
    push_card(&mut header, &format!("NAXIS1  = {:>20}", w));
    push_card(&mut header, &format!("NAXIS2  = {:>20}", h));
    push_card(&mut header, &format!("DATE    = '{}'", Utc::now().format("%Y-%m-%d")));
    push_card(&mut header, &format!("PROGRAM = '{}'", program));
    push_card(&mut header, &format!("VERSION = '{}'", version));
    push_card(&mut header, "END");
    pad_block(&mut header, b' ');
    writer.write_all(&header).map_err(FitsError::Write)?;

    let mut data = Vec::with_capacity(w * h * 4);
    for &v in grid.as_slice() {
        data.write_f32::<BigEndian>(v).map_err(FitsError::Write)?;
    }
    pad_block(&mut data, 0);
    writer.write_all(&data).map_err(FitsError::Write)?;
    writer.flush().map_err(FitsError::Close)?;
    Ok(())
}

/// 기존 파일 헤더의 END 앞에 문자열 카드를 추가한다
pub fn write_keys(path: impl AsRef<Path>, keys: &[(&str, &str)]) -> Result<(), FitsError> {
    let mut contents = Vec::new();
    File::open(&path)
        .map_err(FitsError::Open)?
        .read_to_end(&mut contents)
        .map_err(FitsError::Read)?;

    // END 카드 위치 찾기
    let mut end_card = None;
    'outer: for block_start in (0..contents.len()).step_by(BLOCK) {
        for card_start in (block_start..(block_start + BLOCK).min(contents.len())).step_by(CARD) {
            let card = &contents[card_start..(card_start + CARD).min(contents.len())];
            if card.starts_with(b"END") && card[3..].iter().all(|&b| b == b' ') {
                end_card = Some(card_start);
                break 'outer;
            }
        }
    }
    let end_card = end_card.ok_or_else(|| FitsError::Header("END 카드 없음".into()))?;
    let header_len = (end_card / BLOCK + 1) * BLOCK;

    let mut new_header = contents[..end_card].to_vec();
    for (key, value) in keys {
        push_card(&mut new_header, &format!("{:<8}= '{}'", key, value));
    }
    push_card(&mut new_header, "END");
    pad_block(&mut new_header, b' ');

    let file = File::create(&path).map_err(FitsError::Create)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&new_header).map_err(FitsError::Write)?;
    writer.write_all(&contents[header_len..]).map_err(FitsError::Write)?;
    writer.flush().map_err(FitsError::Close)?;
    Ok(())
}

/// ASCII 텍스트 격자 읽기
///
/// 공백으로 구분된 실수 나열. 앞의 두 값이 같은 양수면 (w, h) 크기
/// 정보로 해석하고, 아니면 전체를 정사각형 데이터로 취급한다
pub fn read_ascii(path: impl AsRef<Path>) -> Result<PixelGrid, FitsError> {
    let mut text = String::new();
    File::open(&path)
        .map_err(FitsError::Open)?
        .read_to_string(&mut text)
        .map_err(FitsError::Read)?;

    let values: Vec<f32> = text
        .split_whitespace()
        .map(|tok| {
            tok.parse::<f32>()
                .map_err(|e| FitsError::Header(format!("숫자 해석 실패 '{}': {}", tok, e)))
        })
        .collect::<Result<_, _>>()?;

    if values.len() >= 2 && values[0] == values[1] && values[0] > 0.0 {
        let dim = values[0] as usize;
        if values.len() - 2 >= dim * dim {
            let data = values[2..2 + dim * dim].to_vec();
            return Ok(PixelGrid::from_vec(data, dim, dim, GridLayout::XFastest));
        }
    }

    let dim = (values.len() as f64).sqrt() as usize;
    if dim == 0 || dim * dim > values.len() {
        return Err(FitsError::Size(dim, dim));
    }
    let data = values[..dim * dim].to_vec();
    Ok(PixelGrid::from_vec(data, dim, dim, GridLayout::XFastest))
}

/// 바이너리 파일인지 판별 (매직 워드 SIMPLE)
pub fn is_binary(path: impl AsRef<Path>) -> Result<bool, FitsError> {
    let mut head = [0u8; 6];
    let mut file = File::open(&path).map_err(FitsError::Open)?;
    match file.read_exact(&mut head) {
        Ok(()) => Ok(&head == b"SIMPLE"),
        Err(_) => Ok(false),
    }
}
