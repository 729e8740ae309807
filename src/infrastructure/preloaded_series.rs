// Loader for preloaded and predicted series shown alongside live data
use crate::domain::telemetry::SeriesData;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct PreloadedFile {
    #[serde(default)]
    series: Vec<SeriesData>,
}

pub fn parse_preloaded_series(source: &str) -> Result<Vec<SeriesData>> {
    let file: PreloadedFile = toml::from_str(source).context("Failed to parse preloaded series")?;

    let mut series = file.series;
    for s in &mut series {
        let before = s.data.len();
        s.data.retain(|p| p.time.is_finite() && p.value.is_finite());
        if s.data.len() < before {
            tracing::warn!("Dropped {} non-finite samples from series {:?}", before - s.data.len(), s.name);
        }
        // The merger expects time order.
        s.data.sort_by(|a, b| a.time.total_cmp(&b.time));
    }
    Ok(series)
}

pub fn load_preloaded_series(path: &Path) -> Result<Vec<SeriesData>> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read preloaded series from {}", path.display()))?;
    let series = parse_preloaded_series(&source)?;
    tracing::info!("Loaded {} preloaded series from {}", series.len(), path.display());
    Ok(series)
}
