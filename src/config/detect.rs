use crate::detect::DetectorOptions;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Input of the `detect_segments` tool.
#[derive(Debug, Deserialize)]
pub struct DetectToolConfig {
    pub images: Vec<PathBuf>,
    #[serde(default)]
    pub detector: DetectorOptions,
    /// Directory receiving one `<image stem>.segments.json` per image.
    pub output_dir: PathBuf,
}

pub fn load_config(path: &Path) -> Result<DetectToolConfig, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    serde_json::from_str(&data)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
}
