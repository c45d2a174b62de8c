use serde::{Deserialize, Serialize};

/// Configuration for blob detection.
///
/// Tuning notes: a smaller `max_dimension` is faster but coarser; a
/// smaller `min_area` catches smaller objects at the cost of more
/// false positives from reflections and color flecks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectConfig {
    /// Longest image side after downscaling, in pixels.
    pub max_dimension: u32,
    /// Minimum pixel area of the largest blob for a positive decision.
    pub min_area: u32,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            max_dimension: 500,
            min_area: 1000,
        }
    }
}

impl DetectConfig {
    /// Set the downscale target dimension.
    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    /// Set the minimum blob area.
    pub fn with_min_area(mut self, min_area: u32) -> Self {
        self.min_area = min_area;
        self
    }
}
