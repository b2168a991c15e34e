//! HTTP route handlers

use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use geo::Point;
use serde::{Deserialize, Serialize};
use stepfree_core::{
    LocationIdx, OffsetBuilder, StreetNodeId, WalkingTime,
    footpaths::EntryId,
    live::TdStep,
    prelude::{
        Direction, ElevatorId, ElevatorStatus, ElevatorUpdate, Mode, Outage, Profile,
        TdOffset, UpdateSummary,
    },
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{error::ApiError, state::AppState};

/// Create the application router
pub fn create_router(state: AppState, max_concurrent_requests: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/update_elevator", post(update_elevator))
        .route("/api/elevators", get(elevators))
        .route("/api/matches", get(matches))
        .route("/api/debug/footpaths", get(debug_footpaths))
        .route("/api/offsets", get(offsets))
        .layer(ConcurrencyLimitLayer::new(max_concurrent_requests.max(1)))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn update_elevator(
    State(state): State<AppState>,
    Json(update): Json<ElevatorUpdate>,
) -> Result<Json<UpdateSummary>, ApiError> {
    tracing::info!(id = %update.id, status = ?update.status, "elevator update");
    let summary =
        tokio::task::spawn_blocking(move || state.accessibility.apply_updates([update])).await??;
    Ok(Json(summary))
}

#[derive(Debug, Serialize)]
struct ElevatorView {
    id: ElevatorId,
    description: String,
    lon: f64,
    lat: f64,
    status: ElevatorStatus,
    outages: Vec<Outage>,
    /// External id of the matched street node
    node: Option<i64>,
}

#[derive(Debug, Serialize)]
struct ElevatorsResponse {
    version: u64,
    elevators: Vec<ElevatorView>,
}

async fn elevators(State(state): State<AppState>) -> Json<ElevatorsResponse> {
    let snapshot = state.accessibility.snapshot();
    let elevators = snapshot
        .elevators()
        .map(|e| ElevatorView {
            id: e.id,
            description: e.description.clone(),
            lon: e.geometry.x(),
            lat: e.geometry.y(),
            status: e.status,
            outages: e.outages.clone(),
            node: snapshot
                .matches()
                .node_of(e.id)
                .and_then(|node| external_node_id(&state, node)),
        })
        .collect();
    Json(ElevatorsResponse {
        version: snapshot.version(),
        elevators,
    })
}

fn external_node_id(state: &AppState, node: StreetNodeId) -> Option<i64> {
    state.dataset.streets.as_ref()?.node(node).map(|n| n.id)
}

fn location_id(state: &AppState, location: LocationIdx) -> String {
    state
        .dataset
        .locations
        .as_ref()
        .and_then(|locations| locations.get(location))
        .map_or_else(|| location.to_string(), |l| l.id.clone())
}

#[derive(Debug, Serialize)]
struct MatchesResponse {
    elevators: BTreeMap<ElevatorId, Option<i64>>,
    unmatched_elevators: usize,
    platforms: BTreeMap<String, Option<i64>>,
}

async fn matches(State(state): State<AppState>) -> Json<MatchesResponse> {
    let snapshot = state.accessibility.snapshot();
    let elevators = snapshot
        .matches()
        .iter()
        .map(|(id, node)| (id, external_node_id(&state, node)))
        .collect();
    let platforms = state
        .dataset
        .platform_matches
        .iter()
        .flat_map(|matches| matches.iter())
        .map(|(location, node)| (location_id(&state, location), external_node_id(&state, node)))
        .collect();

    Json(MatchesResponse {
        elevators,
        unmatched_elevators: snapshot.matches().unmatched(),
        platforms,
    })
}

#[derive(Debug, Deserialize)]
struct FootpathQuery {
    location: String,
    #[serde(default = "default_profile")]
    profile: Profile,
}

fn default_profile() -> Profile {
    Profile::Wheelchair
}

#[derive(Debug, Serialize)]
struct FootpathView {
    to: String,
    duration: WalkingTime,
    /// External ids of the elevator nodes on the path
    elevators: Vec<Option<i64>>,
    alternatives: usize,
    steps: Vec<TdStep>,
}

async fn debug_footpaths(
    State(state): State<AppState>,
    Query(query): Query<FootpathQuery>,
) -> Result<Json<Vec<FootpathView>>, ApiError> {
    let locations = state
        .dataset
        .locations
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("timetable not imported".to_string()))?;
    let from = locations
        .find(&query.location)
        .ok_or_else(|| ApiError::NotFound(format!("unknown location '{}'", query.location)))?;

    let snapshot = state.accessibility.snapshot();
    let views = snapshot
        .footpaths()
        .outgoing(from, query.profile)
        .map(|(id, entry): (EntryId, _)| FootpathView {
            to: location_id(&state, entry.to),
            duration: entry.duration,
            elevators: entry
                .elevators
                .iter()
                .map(|&node| external_node_id(&state, node))
                .collect(),
            alternatives: entry.alternatives.len(),
            steps: snapshot
                .timeline(id)
                .map_or_else(Vec::new, |td| td.steps().to_vec()),
        })
        .collect();
    Ok(Json(views))
}

#[derive(Debug, Deserialize)]
struct OffsetQuery {
    lat: f64,
    lon: f64,
    #[serde(default = "default_direction")]
    direction: Direction,
    /// Comma separated, `walk` if unset
    modes: Option<String>,
    #[serde(default)]
    wheelchair: bool,
    max: Option<WalkingTime>,
}

fn default_direction() -> Direction {
    Direction::Forward
}

#[derive(Debug, Serialize)]
struct OffsetView {
    location: String,
    duration: WalkingTime,
    mode: Mode,
}

#[derive(Debug, Serialize)]
struct OffsetsResponse {
    snapshot: u64,
    offsets: Vec<OffsetView>,
    /// Only for wheelchair queries
    td_offsets: BTreeMap<String, Vec<TdOffset>>,
}

fn parse_modes(modes: Option<&str>) -> Result<Vec<Mode>, ApiError> {
    let Some(modes) = modes else {
        return Ok(vec![Mode::Walk]);
    };
    modes
        .split(',')
        .map(|mode| mode.trim().parse::<Mode>().map_err(ApiError::from))
        .collect()
}

async fn offsets(
    State(state): State<AppState>,
    Query(query): Query<OffsetQuery>,
) -> Result<Json<OffsetsResponse>, ApiError> {
    let modes = parse_modes(query.modes.as_deref())?;
    let max = query
        .max
        .unwrap_or(state.settings.max_duration)
        .min(state.settings.max_duration);
    let response =
        tokio::task::spawn_blocking(move || compute_offsets(&state, &query, &modes, max)).await??;
    Ok(Json(response))
}

fn compute_offsets(
    state: &AppState,
    query: &OffsetQuery,
    modes: &[Mode],
    max: WalkingTime,
) -> Result<OffsetsResponse, ApiError> {
    let unavailable = || ApiError::Unavailable("street routing or timetable not imported".to_string());
    let graph = state.dataset.streets.as_ref().ok_or_else(unavailable)?;
    let platforms = state.dataset.platform_matches.as_ref().ok_or_else(unavailable)?;

    let builder = OffsetBuilder::new(graph, platforms, state.accessibility.snapshot())
        .with_match_radius(state.settings.match_radius);
    let point = Point::new(query.lon, query.lat);

    let offsets = builder
        .get_offsets(&point, query.direction, modes, query.wheelchair, max)
        .into_iter()
        .map(|offset| OffsetView {
            location: location_id(state, offset.location),
            duration: offset.duration,
            mode: offset.mode,
        })
        .collect();
    let td_offsets = if query.wheelchair {
        builder
            .get_td_offsets(&point, query.direction, modes, true, max)
            .into_iter()
            .map(|(location, steps)| (location_id(state, location), steps))
            .collect()
    } else {
        BTreeMap::new()
    };

    Ok(OffsetsResponse {
        snapshot: builder.snapshot().version(),
        offsets,
        td_offsets,
    })
}
