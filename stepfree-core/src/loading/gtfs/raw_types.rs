use serde::Deserialize;

/// Row of `stops.txt`, coordinates are parsed later so that one broken
/// stop does not fail the whole feed
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FeedStop {
    pub stop_id: String,
    pub stop_name: String,
    pub stop_lat: String,
    pub stop_lon: String,
    pub parent_station: String,
    pub platform_code: String,
}
