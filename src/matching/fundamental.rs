use crate::geometry::fundamental_matrix;
use crate::types::ViewId;
use crate::view::View;
use nalgebra::Matrix3;
use std::collections::HashMap;

/// Memoized fundamental matrices, keyed by ordered view pair.
///
/// Only one orientation of each unordered pair is ever computed; the reverse
/// lookup returns the transpose.
#[derive(Clone, Debug, Default)]
pub struct FundamentalCache {
    entries: HashMap<(ViewId, ViewId), Matrix3<f64>>,
    computed: usize,
}

impl FundamentalCache {
    /// `F` mapping source pixels to epipolar lines in the target view.
    pub fn get(&mut self, src: &View, tgt: &View) -> Matrix3<f64> {
        let key = (src.id(), tgt.id());
        if let Some(f) = self.entries.get(&key) {
            return *f;
        }
        if let Some(f) = self.entries.get(&(tgt.id(), src.id())) {
            return f.transpose();
        }
        let f = fundamental_matrix(src.camera(), tgt.camera());
        self.entries.insert(key, f);
        self.computed += 1;
        f
    }

    /// Number of matrices actually computed so far.
    pub fn computed(&self) -> usize {
        self.computed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
