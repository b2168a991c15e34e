use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{
    ELEVATOR_MATCH_RADIUS, Error, MAX_ALTERNATIVES, MAX_FOOTPATH_DURATION, PLATFORM_MATCH_RADIUS,
    WalkingTime, footpaths::FootpathConfig,
};

/// Optional parts of the import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    StreetRouting,
    Timetable,
    Elevators,
    Footpaths,
}

impl Feature {
    pub const ALL: [Feature; 4] = [
        Feature::StreetRouting,
        Feature::Timetable,
        Feature::Elevators,
        Feature::Footpaths,
    ];
}

/// Configuration of the import pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Directory containing `nodes.csv` and `edges.csv`
    pub streets: Option<PathBuf>,
    /// GTFS directories providing the timetable locations
    pub gtfs_dirs: Vec<PathBuf>,
    /// Elevator feed (FaSta JSON)
    pub elevators: Option<PathBuf>,
    /// Features to enable, all when unset
    pub enabled_features: Option<Vec<Feature>>,
    pub disabled_features: Option<Vec<Feature>>,
    /// Maximum footpath duration in seconds
    pub max_footpath_duration: WalkingTime,
    /// Meters
    pub elevator_match_radius: f64,
    /// Meters
    pub platform_match_radius: f64,
    /// Detour candidates kept per footpath, 0 keeps only the best path
    pub max_alternatives: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            streets: None,
            gtfs_dirs: Vec::new(),
            elevators: None,
            enabled_features: None,
            disabled_features: None,
            max_footpath_duration: MAX_FOOTPATH_DURATION,
            elevator_match_radius: ELEVATOR_MATCH_RADIUS,
            platform_match_radius: PLATFORM_MATCH_RADIUS,
            max_alternatives: MAX_ALTERNATIVES,
        }
    }
}

impl ImportConfig {
    pub fn has_feature(&self, feature: Feature) -> bool {
        let enabled = self
            .enabled_features
            .as_ref()
            .is_none_or(|features| features.contains(&feature));
        let disabled = self
            .disabled_features
            .as_ref()
            .is_some_and(|features| features.contains(&feature));
        enabled && !disabled
    }

    pub fn footpath_config(&self) -> FootpathConfig {
        FootpathConfig {
            max_duration: self.max_footpath_duration,
            max_alternatives: self.max_alternatives,
        }
    }

    /// Check that every enabled feature has its inputs
    ///
    /// # Errors
    ///
    /// Returns an error if a feature lacks its input data or a dependent
    /// feature, or if an input path does not exist.
    pub fn verify(&self) -> Result<(), Error> {
        if self.has_feature(Feature::StreetRouting) {
            let dir = self.streets.as_ref().ok_or_else(|| {
                Error::InvalidConfig("feature street_routing requires `streets`".to_string())
            })?;
            for file in ["nodes.csv", "edges.csv"] {
                ensure_exists(&dir.join(file))?;
            }
        }

        if self.has_feature(Feature::Timetable) {
            if self.gtfs_dirs.is_empty() {
                return Err(Error::InvalidConfig(
                    "feature timetable requires at least one GTFS directory".to_string(),
                ));
            }
            for dir in &self.gtfs_dirs {
                ensure_exists(dir)?;
            }
        }

        if self.has_feature(Feature::Elevators) {
            let path = self.elevators.as_ref().ok_or_else(|| {
                Error::InvalidConfig("feature elevators requires `elevators`".to_string())
            })?;
            ensure_exists(path)?;
            self.require(Feature::Elevators, Feature::StreetRouting)?;
        }

        if self.has_feature(Feature::Footpaths) {
            self.require(Feature::Footpaths, Feature::StreetRouting)?;
            self.require(Feature::Footpaths, Feature::Timetable)?;
        }

        if self.max_footpath_duration == 0 {
            return Err(Error::InvalidConfig(
                "max_footpath_duration must be positive".to_string(),
            ));
        }
        if self.elevator_match_radius <= 0.0 || self.platform_match_radius <= 0.0 {
            return Err(Error::InvalidConfig(
                "match radii must be positive".to_string(),
            ));
        }

        Ok(())
    }

    fn require(&self, feature: Feature, dependency: Feature) -> Result<(), Error> {
        if self.has_feature(dependency) {
            Ok(())
        } else {
            Err(Error::InvalidConfig(format!(
                "feature {feature:?} requires feature {dependency:?}"
            )))
        }
    }
}

fn ensure_exists(path: &std::path::Path) -> Result<(), Error> {
    if path.exists() {
        Ok(())
    } else {
        Err(Error::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Input not found: {}", path.display()),
        )))
    }
}
