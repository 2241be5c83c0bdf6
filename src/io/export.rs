//! Writers for reconstructed 3D lines.
//!
//! OBJ: one `v` pair and one `l` record per 3D segment.
//! STL: one degenerate facet per 3D segment (viewers render its edge).
//! TXT: one row per line: segment count, segment endpoints, residual count,
//! then `view segment x1 y1 x2 y2` per residual.

use super::write_text_file;
use crate::lines::FinalLine3D;
use crate::reconstruction::{MatchingParams, ReconstructParams};
use crate::types::ViewId;
use crate::view::View;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

pub fn format_obj(lines: &[FinalLine3D]) -> String {
    let mut out = String::new();
    let mut vertex = 1usize;
    let mut records = Vec::new();
    for seg in lines.iter().flat_map(|l| l.segments.iter()) {
        let _ = writeln!(out, "v {} {} {}", seg.p1.x, seg.p1.y, seg.p1.z);
        let _ = writeln!(out, "v {} {} {}", seg.p2.x, seg.p2.y, seg.p2.z);
        records.push(vertex);
        vertex += 2;
    }
    for v in records {
        let _ = writeln!(out, "l {} {}", v, v + 1);
    }
    out
}

pub fn format_stl(lines: &[FinalLine3D]) -> String {
    let mut out = String::from("solid lineModel\n");
    for seg in lines.iter().flat_map(|l| l.segments.iter()) {
        let (a, b) = (seg.p1, seg.p2);
        out.push_str(" facet normal 1.0e+000 0.0e+000 0.0e+000\n  outer loop\n");
        for p in [a, b, a] {
            let _ = writeln!(out, "   vertex {:e} {:e} {:e}", p.x, p.y, p.z);
        }
        out.push_str("  endloop\n endfacet\n");
    }
    out.push_str("endsolid lineModel\n");
    out
}

pub fn format_txt(lines: &[FinalLine3D], views: &BTreeMap<ViewId, View>) -> String {
    let mut out = String::new();
    for line in lines.iter().filter(|l| !l.segments.is_empty()) {
        let _ = write!(out, "{} ", line.segments.len());
        for seg in &line.segments {
            let _ = write!(
                out,
                "{} {} {} {} {} {} ",
                seg.p1.x, seg.p1.y, seg.p1.z, seg.p2.x, seg.p2.y, seg.p2.z
            );
        }
        let _ = write!(out, "{} ", line.cluster.residuals.len());
        for res in &line.cluster.residuals {
            let coords = views
                .get(&res.view)
                .and_then(|v| v.segment(res.index as usize))
                .map(|s| [s.p1[0], s.p1[1], s.p2[0], s.p2[1]])
                .unwrap_or([0.0; 4]);
            let _ = write!(
                out,
                "{} {} {} {} {} {} ",
                res.view, res.index, coords[0], coords[1], coords[2], coords[3]
            );
        }
        out.push('\n');
    }
    out
}

pub fn write_lines_obj(path: &Path, lines: &[FinalLine3D]) -> Result<(), String> {
    if lines.is_empty() {
        log::warn!("Export: no 3D lines to save, {} not written", path.display());
        return Ok(());
    }
    write_text_file(path, &format_obj(lines))
}

pub fn write_lines_stl(path: &Path, lines: &[FinalLine3D]) -> Result<(), String> {
    if lines.is_empty() {
        log::warn!("Export: no 3D lines to save, {} not written", path.display());
        return Ok(());
    }
    write_text_file(path, &format_stl(lines))
}

pub fn write_lines_txt(
    path: &Path,
    lines: &[FinalLine3D],
    views: &BTreeMap<ViewId, View>,
) -> Result<(), String> {
    if lines.is_empty() {
        log::warn!("Export: no 3D lines to save, {} not written", path.display());
        return Ok(());
    }
    write_text_file(path, &format_txt(lines, views))
}

/// File stem encoding the parameters of a run.
pub fn output_stem(
    max_image_width: u32,
    matching: &MatchingParams,
    reconstruct: &ReconstructParams,
) -> String {
    let settings = matching.resolve();
    let mut stem = format!(
        "Line3D++__W_{}__N_{}__sigmaP_{}__sigmaA_{}__epiOverlap_{}__minBaseline_{}__",
        max_image_width,
        settings.num_neighbors,
        matching.sigma_position.abs(),
        settings.sigma_angle,
        settings.epipolar_overlap,
        settings.min_baseline
    );
    if settings.knn > 0 {
        let _ = write!(stem, "kNN_{}__", settings.knn);
    }
    if let Some(t) = reconstruct.resolved_collinearity() {
        let _ = write!(stem, "COLLIN_{t}__");
    }
    if matching.sigma_position < 0.0 {
        stem.push_str("FXD_SIGMA_P__");
    }
    if reconstruct.perform_diffusion {
        stem.push_str("DIFFUSION__");
    }
    if reconstruct.use_optimizer {
        stem.push_str("OPTIMIZED__");
    }
    let _ = write!(stem, "vis_{}", reconstruct.resolved_visibility());
    stem
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Segment3D;
    use crate::lines::LineCluster3D;
    use crate::types::Segment2D;
    use nalgebra::Vector3;

    fn line() -> FinalLine3D {
        let seg = Segment3D::new(Vector3::new(0.0, 0.0, 1.0), Vector3::new(1.0, 0.0, 1.0));
        FinalLine3D {
            segments: vec![seg, seg],
            cluster: LineCluster3D {
                line: seg,
                representative: Segment2D::new(0, 0),
                residuals: vec![Segment2D::new(0, 0), Segment2D::new(4, 2)],
            },
        }
    }

    #[test]
    fn obj_pairs_vertices_into_lines() {
        let obj = format_obj(&[line()]);
        assert_eq!(obj.lines().filter(|l| l.starts_with("v ")).count(), 4);
        assert!(obj.contains("l 1 2\n"));
        assert!(obj.contains("l 3 4\n"));
    }

    #[test]
    fn stl_has_one_facet_per_segment() {
        let stl = format_stl(&[line()]);
        assert!(stl.starts_with("solid lineModel"));
        assert_eq!(stl.matches("facet normal").count(), 2);
        assert!(stl.trim_end().ends_with("endsolid lineModel"));
    }

    #[test]
    fn txt_lists_segments_then_residuals() {
        let txt = format_txt(&[line()], &BTreeMap::new());
        let fields: Vec<&str> = txt.split_whitespace().collect();
        assert_eq!(fields[0], "2");
        assert_eq!(fields[13], "2");
        assert_eq!(&fields[14..16], &["0", "0"]);
        assert_eq!(&fields[20..22], &["4", "2"]);
    }

    #[test]
    fn stem_reflects_options() {
        let matching = MatchingParams {
            sigma_position: -0.1,
            knn: 0,
            ..Default::default()
        };
        let reconstruct = ReconstructParams {
            collinearity_t: 2.0,
            ..Default::default()
        };
        let stem = output_stem(1920, &matching, &reconstruct);
        assert!(stem.starts_with("Line3D++__W_1920__N_10__"));
        assert!(stem.contains("FXD_SIGMA_P__"));
        assert!(stem.contains("COLLIN_2__"));
        assert!(!stem.contains("kNN_"));
        assert!(stem.ends_with("vis_3"));
    }
}
