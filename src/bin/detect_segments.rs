use line3d::config::detect;
use line3d::detect::{GradientLineDetector, SegmentDetector};
use line3d::diagnostics::elapsed_ms;
use line3d::io::{load_grayscale_image, write_json_file};
use line3d::LineSegment;
use serde::Serialize;
use std::env;
use std::path::Path;
use std::time::Instant;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = detect::load_config(Path::new(&config_path))?;
    let detector = GradientLineDetector::new(config.detector);

    for image_path in &config.images {
        let gray = load_grayscale_image(image_path)?;
        let start = Instant::now();
        let segments = detector.detect(&gray);
        let report = SegmentsReport {
            image: image_path.display().to_string(),
            width: gray.width(),
            height: gray.height(),
            elapsed_ms: elapsed_ms(start),
            segments,
        };

        let stem = image_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| format!("Invalid image name {}", image_path.display()))?;
        let out = config.output_dir.join(format!("{stem}.segments.json"));
        write_json_file(&out, &report)?;
        println!(
            "Saved {} segments to {} ({:.1} ms)",
            report.segments.len(),
            out.display(),
            report.elapsed_ms
        );
    }
    Ok(())
}

fn usage() -> String {
    "Usage: detect_segments <config.json>".to_string()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SegmentsReport {
    image: String,
    width: u32,
    height: u32,
    elapsed_ms: f64,
    segments: Vec<LineSegment>,
}
