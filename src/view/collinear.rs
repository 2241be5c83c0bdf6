use crate::types::LineSegment;

/// For every segment, the indices of the other segments lying on (nearly)
/// the same image line.
///
/// Segment `j` is collinear to `i` when both endpoints of `j` are within
/// `threshold_px` of the infinite line through `i`, and vice versa. The
/// relation is symmetric; degenerate segments have no collinear partners.
pub fn find_collinear(segments: &[LineSegment], threshold_px: f64) -> Vec<Vec<u32>> {
    let mut collinear = vec![Vec::new(); segments.len()];
    if threshold_px <= 0.0 {
        return collinear;
    }
    let lines: Vec<_> = segments.iter().map(|s| s.line()).collect();

    let close = |line: &nalgebra::Vector3<f64>, p: [f64; 2]| {
        (line[0] * p[0] + line[1] * p[1] + line[2]).abs() < threshold_px
    };

    for i in 0..segments.len() {
        let Some(li) = lines[i] else { continue };
        for j in (i + 1)..segments.len() {
            let Some(lj) = lines[j] else { continue };
            let (si, sj) = (&segments[i], &segments[j]);
            if close(&li, sj.p1) && close(&li, sj.p2) && close(&lj, si.p1) && close(&lj, si.p2) {
                collinear[i].push(j as u32);
                collinear[j].push(i as u32);
            }
        }
    }
    collinear
}
