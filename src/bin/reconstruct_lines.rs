use line3d::config::dataset::{self, DatasetConfig, ViewConfig};
use line3d::detect::{GradientLineDetector, SegmentDetector};
use line3d::diagnostics::{MatchingReport, ReconstructionReport};
use line3d::io::{
    load_grayscale_image, output_stem, write_json_file, write_lines_obj, write_lines_stl,
    write_lines_txt,
};
use line3d::reconstruction::ViewInput;
use line3d::{FinalLine3D, Reconstructor};
use serde::Serialize;
use std::env;
use std::path::Path;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = dataset::load_config(Path::new(&config_path))?;
    let base_dir = Path::new(&config_path)
        .parent()
        .unwrap_or_else(|| Path::new("."));

    let detector = GradientLineDetector::new(config.detector);
    let mut recon = Reconstructor::new();
    for view in &config.views {
        let input = view_input(view, &detector, base_dir)?;
        recon.add_view(input).map_err(|e| e.to_string())?;
    }

    let matching = recon
        .match_views(&config.matching)
        .map_err(|e| e.to_string())?;
    let reconstruction = recon
        .reconstruct(&config.reconstruction)
        .map_err(|e| e.to_string())?;

    write_outputs(&config, &recon, matching, reconstruction)
}

fn view_input(
    view: &ViewConfig,
    detector: &GradientLineDetector,
    base_dir: &Path,
) -> Result<ViewInput, String> {
    if let Some(segments) = view.inline_segments() {
        let width = view
            .width
            .ok_or_else(|| format!("View {} with inline segments needs `width`", view.id))?;
        let height = view
            .height
            .ok_or_else(|| format!("View {} with inline segments needs `height`", view.id))?;
        return view.to_view_input(segments, width, height);
    }
    let image_path = view
        .image
        .as_ref()
        .ok_or_else(|| format!("View {} needs `segments` or `image`", view.id))?;
    let gray = load_grayscale_image(&base_dir.join(image_path))?;
    let segments = detector.detect(&gray);
    println!(
        "View {}: detected {} segments in {}",
        view.id,
        segments.len(),
        image_path.display()
    );
    view.to_view_input(segments, gray.width(), gray.height())
}

fn write_outputs(
    config: &DatasetConfig,
    recon: &Reconstructor,
    matching: MatchingReport,
    reconstruction: ReconstructionReport,
) -> Result<(), String> {
    let out = &config.output;
    let stem = out.name.clone().unwrap_or_else(|| {
        output_stem(
            config.detector.max_image_width,
            &config.matching,
            &config.reconstruction,
        )
    });
    let lines = recon.lines();

    if out.json {
        let path = out.directory.join(format!("{stem}.json"));
        let summary = ReconstructionSummary {
            matching,
            reconstruction,
            lines,
        };
        write_json_file(&path, &summary)?;
        println!("Saved report to {}", path.display());
    }
    if out.obj {
        let path = out.directory.join(format!("{stem}.obj"));
        write_lines_obj(&path, lines)?;
        println!("Saved {} lines to {}", lines.len(), path.display());
    }
    if out.stl {
        let path = out.directory.join(format!("{stem}.stl"));
        write_lines_stl(&path, lines)?;
        println!("Saved {} lines to {}", lines.len(), path.display());
    }
    if out.txt {
        let path = out.directory.join(format!("{stem}.txt"));
        write_lines_txt(&path, lines, recon.views())?;
        println!("Saved {} lines to {}", lines.len(), path.display());
    }
    Ok(())
}

fn usage() -> String {
    "Usage: reconstruct_lines <dataset.json>".to_string()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReconstructionSummary<'a> {
    matching: MatchingReport,
    reconstruction: ReconstructionReport,
    lines: &'a [FinalLine3D],
}
