//! 파이프라인 드라이버 통합 동작 테스트
//!
//! 작은 이미지로 전체 경로(읽기 -> 병렬 반경 루프 -> 기록 -> 요약)를
//! 돌려 파일 산출물과 실패 규약을 확인한다

use tempfile::tempdir;

use crate::core::pipeline::driver::{Pipeline, RunOptions};
use crate::core::types::{FileRec, PixelGrid, FREQ_BINS, M_FIN, M_INI};
use crate::io::{fits, records};

fn spiral_image(dim: usize) -> PixelGrid {
    let mut g = PixelGrid::zeros(dim, dim);
    let c = ((dim - 1) / 2) as f64;
    for y in 0..dim {
        for x in 0..dim {
            let dx = x as f64 - c;
            let dy = y as f64 - c;
            let r = (dx * dx + dy * dy).sqrt().max(1e-6);
            let theta = dy.atan2(dx);
            let v = 2.0 + (2.0 * theta + 4.0 * r.ln()).cos();
            g.set(x, y, v as f32);
        }
    }
    g
}

fn run_on(image: &PixelGrid, dir: &std::path::Path, name: &str) -> (FileRec, Pipeline) {
    let img_path = dir.join(format!("{}.fits", name));
    fits::write(&img_path, image, true, "spiral2dfft/", "test").unwrap();
    let rec = FileRec {
        name: img_path.to_string_lossy().into_owned(),
        result: dir.join(name).to_string_lossy().into_owned(),
        keyword: "outi".to_string(),
        radius: None,
        binary: true,
    };
    (rec, Pipeline::new(RunOptions::default()))
}

#[test]
fn 전체_경로_산출물_확인() {
    let dir = tempdir().unwrap();
    let image = spiral_image(17); // 반경 8 -> 계산 반경 1..=7
    let (rec, pipeline) = run_on(&image, dir.path(), "gal");

    let report = pipeline.process_image(&rec).unwrap();
    assert_eq!(report.radius, 8);
    assert_eq!(report.radii_processed, 7);
    assert_eq!(report.record_failures, 0);

    // 모드별 요약과 합산 파일
    for mode in M_INI..=M_FIN {
        let summary = format!("{}_m{}", rec.result, mode);
        let text = std::fs::read_to_string(&summary).unwrap();
        // 계산 안 된 최대 반경 행까지 포함해 반경 수만큼
        assert_eq!(text.lines().count(), 8, "mode {}", mode);

        let sum = format!("{}_sum_m{}", rec.result, mode);
        let text = std::fs::read_to_string(&sum).unwrap();
        assert_eq!(text.lines().count(), FREQ_BINS);
    }

    // 반경별 레코드 파일 확인
    let rip = records::read_rip(&records::rip_path(
        std::path::Path::new(&rec.result),
        "outi",
        3,
        2,
    ))
    .unwrap();
    assert!(records::rip_count_ok(&rip));
    assert_eq!(rip.radius_echo, 8); // 이미지 폭 17의 절반
    assert!(rip.norma > 0.0);

    // 요약 파일에서 최대 반경 복원 (역변환기가 쓰는 경로)
    let m1 = format!("{}_m1", rec.result);
    assert_eq!(records::max_radius_from_summary(std::path::Path::new(&m1)).unwrap(), 8);
}

#[test]
fn 밝기가_전부_0이면_결과는_nan이고_합산은_비어있다() {
    let dir = tempdir().unwrap();
    let image = PixelGrid::zeros(17, 17);
    let (rec, pipeline) = run_on(&image, dir.path(), "empty");

    let report = pipeline.process_image(&rec).unwrap();
    assert_eq!(report.radii_processed, 7);

    // 요약의 모든 행은 NaN 필드
    let summary = format!("{}_m2", rec.result);
    let text = std::fs::read_to_string(&summary).unwrap();
    for line in text.lines() {
        assert!(line.contains("NaN"), "{}", line);
    }

    // 누산기는 단 한 셀도 안 바뀌어야 함
    let sum = format!("{}_sum_m{}", rec.result, 2);
    let text = std::fs::read_to_string(&sum).unwrap();
    for line in text.lines() {
        let amp = line.split_whitespace().nth(1).unwrap();
        assert_eq!(amp.parse::<f64>().unwrap(), 0.0, "{}", line);
    }
}

#[test]
fn 너무_작은_이미지는_이미지_단위_오류() {
    let dir = tempdir().unwrap();
    let image = PixelGrid::zeros(3, 3);
    let (rec, pipeline) = run_on(&image, dir.path(), "tiny");
    assert!(pipeline.process_image(&rec).is_err());
}

#[test]
fn 없는_파일은_이미지_단위_오류() {
    let pipeline = Pipeline::new(RunOptions::default());
    let rec = FileRec {
        name: "no_such.fits".into(),
        result: "no_such".into(),
        keyword: "outi".into(),
        radius: None,
        binary: true,
    };
    assert!(pipeline.process_image(&rec).is_err());
}

#[test]
fn 고정폭_정책은_양끝_반경을_건너뛴다() {
    use crate::core::mapping::annulus::RadialPolicy;

    let dir = tempdir().unwrap();
    let image = spiral_image(33); // 반경 16
    let img_path = dir.path().join("fx.fits");
    fits::write(&img_path, &image, true, "spiral2dfft/", "test").unwrap();
    let rec = FileRec {
        name: img_path.to_string_lossy().into_owned(),
        result: dir.path().join("fx").to_string_lossy().into_owned(),
        keyword: "outi".to_string(),
        radius: None,
        binary: true,
    };
    let pipeline = Pipeline::new(RunOptions {
        policy: RadialPolicy::FixedWindow { width: 8 },
        ..RunOptions::default()
    });

    let report = pipeline.process_image(&rec).unwrap();
    // 반경 5..=11만 계산 (1..=4와 12..=15는 창이 이미지를 벗어남)
    assert_eq!(report.radii_processed, 7);

    // 건너뛴 반경의 레코드 파일은 없어야 함
    let skipped = records::rip_path(std::path::Path::new(&rec.result), "outi", 2, 1);
    assert!(!skipped.exists());
    let present = records::rip_path(std::path::Path::new(&rec.result), "outi", 8, 1);
    assert!(present.exists());
}
