use std::sync::Arc;

use stepfree_core::{AccessibilityState, Dataset, WalkingTime};

use crate::config::ServeConfig;

#[derive(Debug, Clone, Copy)]
pub struct QuerySettings {
    pub match_radius: f64,
    pub max_duration: WalkingTime,
}

/// Shared application state
///
/// The dataset is immutable. The accessibility state is the only part that
/// changes while serving.
#[derive(Debug, Clone)]
pub struct AppState {
    pub dataset: Arc<Dataset>,
    pub accessibility: Arc<AccessibilityState>,
    pub settings: QuerySettings,
}

impl AppState {
    pub fn new(dataset: Dataset, config: &ServeConfig) -> Self {
        let footpaths = dataset.footpaths.clone().unwrap_or_default();
        let matches = dataset.elevator_matches.clone().unwrap_or_default();
        let elevators = dataset.elevators.as_deref().map_or(&[][..], Vec::as_slice);
        let accessibility = AccessibilityState::new(footpaths, matches, elevators);

        Self {
            accessibility: Arc::new(accessibility),
            dataset: Arc::new(dataset),
            settings: QuerySettings {
                match_radius: config.offset_match_radius,
                max_duration: config.max_offset_duration,
            },
        }
    }
}
