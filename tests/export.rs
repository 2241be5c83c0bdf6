mod common;

use common::init_logger;
use common::synthetic_scene::{build_session, lower_line, upper_line};
use line3d::io::{output_stem, write_json_file, write_lines_obj, write_lines_stl, write_lines_txt};
use line3d::prelude::*;
use std::fs;
use std::path::PathBuf;

fn scratch_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("line3d_{name}_{}", std::process::id()))
}

#[test]
fn reconstruction_exports_to_all_formats() {
    init_logger();
    let mut recon = build_session(&[0.0, 1.0, 2.0], &[upper_line(), lower_line()], 0.0);
    let matching = MatchingParams::default();
    let reconstruct = ReconstructParams::default();
    recon.match_views(&matching).unwrap();
    recon.reconstruct(&reconstruct).unwrap();
    let lines = recon.lines();
    assert_eq!(lines.len(), 2);
    let segments: usize = lines.iter().map(|l| l.segments.len()).sum();

    let dir = scratch_dir("export");
    let stem = output_stem(1920, &matching, &reconstruct);
    let obj = dir.join(format!("{stem}.obj"));
    let stl = dir.join(format!("{stem}.stl"));
    let txt = dir.join(format!("{stem}.txt"));
    let json = dir.join(format!("{stem}.json"));
    write_lines_obj(&obj, lines).unwrap();
    write_lines_stl(&stl, lines).unwrap();
    write_lines_txt(&txt, lines, recon.views()).unwrap();
    write_json_file(&json, &lines).unwrap();

    let obj_text = fs::read_to_string(&obj).unwrap();
    assert_eq!(obj_text.lines().filter(|l| l.starts_with("v ")).count(), 2 * segments);
    assert_eq!(obj_text.lines().filter(|l| l.starts_with("l ")).count(), segments);

    let stl_text = fs::read_to_string(&stl).unwrap();
    assert_eq!(stl_text.matches("endfacet").count(), segments);

    let txt_text = fs::read_to_string(&txt).unwrap();
    let rows: Vec<&str> = txt_text.lines().collect();
    assert_eq!(rows.len(), 2);
    for (row, line) in rows.iter().zip(lines) {
        let fields: Vec<f64> = row.split_whitespace().map(|f| f.parse().unwrap()).collect();
        let n = line.segments.len();
        assert_eq!(fields[0] as usize, n);
        assert_eq!(fields[1 + 6 * n] as usize, line.cluster.residuals.len());
        assert_eq!(fields.len(), 2 + 6 * n + 6 * line.cluster.residuals.len());
    }

    let parsed: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
    let array = parsed.as_array().unwrap();
    assert_eq!(array.len(), 2);
    assert!(array[0]["cluster"]["residuals"].is_array());

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn empty_results_create_no_files() {
    init_logger();
    let dir = scratch_dir("empty");
    let obj = dir.join("empty.obj");
    let stl = dir.join("empty.stl");
    let txt = dir.join("empty.txt");
    write_lines_obj(&obj, &[]).unwrap();
    write_lines_stl(&stl, &[]).unwrap();
    write_lines_txt(&txt, &[], &Default::default()).unwrap();
    assert!(!obj.exists());
    assert!(!stl.exists());
    assert!(!txt.exists());
    fs::remove_dir_all(&dir).ok();
}
