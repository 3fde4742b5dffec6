// API module for headless mode - HTTP endpoints to interact with the simulation

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

use crate::config::SimulationConfig;
use crate::simulation::{ColonyStats, Simulation};
use crate::types::{Occupant, RenderSegment, Resource};
use ::rand::rngs::StdRng;

#[derive(Serialize, Clone)]
pub struct SimulationStateResponse {
    pub segments: Vec<RenderSegment>,
    pub resources: Vec<Resource>,
    pub stats: ColonyStats,
    pub paused: bool,
}

/// Largest `steps` a single `/step` request may ask for.
pub const MAX_STEPS_PER_REQUEST: usize = 10_000;

#[derive(Deserialize)]
pub struct StepQuery {
    pub steps: Option<usize>,
}

#[derive(Deserialize)]
pub struct NeighbourQuery {
    pub x: f32,
    pub y: f32,
    pub radius: Option<f32>,
}

#[derive(Serialize)]
pub struct NeighbourEntry {
    pub position: Vec2,
    pub occupant: Occupant,
}

#[derive(Deserialize)]
pub struct SpawnRequest {
    pub x: f32,
    pub y: f32,
}

#[derive(Serialize)]
pub struct SpawnResponse {
    pub id: usize,
}

// Shared state for the API server
#[derive(Clone)]
pub struct ApiState {
    pub simulation: Arc<Mutex<Simulation>>,
    pub rng: Arc<Mutex<StdRng>>,
}

impl ApiState {
    pub fn new(sim: Simulation, rng: StdRng) -> Self {
        Self {
            simulation: Arc::new(Mutex::new(sim)),
            rng: Arc::new(Mutex::new(rng)),
        }
    }
}

// Helper function to convert simulation state to API response
fn simulation_to_response(sim: &Simulation) -> SimulationStateResponse {
    SimulationStateResponse {
        segments: sim.segments().collect(),
        resources: sim.colony.resources.clone(),
        stats: sim.stats(),
        paused: sim.paused,
    }
}

// GET /state - Get current simulation state
async fn get_state(
    State(api_state): State<ApiState>,
) -> Result<Json<SimulationStateResponse>, StatusCode> {
    let sim = api_state
        .simulation
        .lock()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(simulation_to_response(&sim)))
}

// GET /stats - Get simulation statistics
async fn get_stats(State(api_state): State<ApiState>) -> Result<Json<ColonyStats>, StatusCode> {
    let sim = api_state
        .simulation
        .lock()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(sim.stats()))
}

// POST /step - Step the simulation forward
async fn step_simulation(
    Query(params): Query<StepQuery>,
    State(api_state): State<ApiState>,
) -> Result<Json<SimulationStateResponse>, StatusCode> {
    let steps = params.steps.unwrap_or(1);
    if steps > MAX_STEPS_PER_REQUEST {
        return Err(StatusCode::BAD_REQUEST);
    }

    let mut sim = api_state
        .simulation
        .lock()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let mut rng = api_state
        .rng
        .lock()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let frame_dt = sim.config.headless_frame_dt;

    for _ in 0..steps {
        sim.step(&mut *rng, frame_dt);
    }

    Ok(Json(simulation_to_response(&sim)))
}

// POST /reset - Reset the simulation
async fn reset_simulation(
    State(api_state): State<ApiState>,
) -> Result<Json<SimulationStateResponse>, StatusCode> {
    let mut sim = api_state
        .simulation
        .lock()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let mut rng = api_state
        .rng
        .lock()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    sim.reset(&mut *rng);

    Ok(Json(simulation_to_response(&sim)))
}

// POST /pause - Toggle pause
async fn pause_simulation(
    State(api_state): State<ApiState>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let mut sim = api_state
        .simulation
        .lock()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    sim.toggle_pause();
    Ok(Json(serde_json::json!({ "paused": sim.paused })))
}

// GET /config - Get simulation configuration
async fn get_config(
    State(api_state): State<ApiState>,
) -> Result<Json<SimulationConfig>, StatusCode> {
    let sim = api_state
        .simulation
        .lock()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(sim.config.clone()))
}

// GET /neighbours - Spatial index entries around {x, y}
async fn get_neighbours(
    Query(query): Query<NeighbourQuery>,
    State(api_state): State<ApiState>,
) -> Result<Json<Vec<NeighbourEntry>>, StatusCode> {
    let sim = api_state
        .simulation
        .lock()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let position = Vec2::new(query.x, query.y);
    let radius = query.radius.unwrap_or(sim.config.neighbour_radius);
    if !position.is_finite() || !radius.is_finite() || radius < 0.0 {
        return Err(StatusCode::BAD_REQUEST);
    }
    let entries = sim
        .occupants_near(position, radius)
        .into_iter()
        .map(|(position, occupant)| NeighbourEntry { position, occupant })
        .collect();
    Ok(Json(entries))
}

// POST /tips - Spawn a growth tip at {x, y}
async fn spawn_tip(
    State(api_state): State<ApiState>,
    Json(req): Json<SpawnRequest>,
) -> Result<Json<SpawnResponse>, StatusCode> {
    let mut sim = api_state
        .simulation
        .lock()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let position = Vec2::new(req.x, req.y);
    if !sim.config.contains(position) {
        return Err(StatusCode::BAD_REQUEST);
    }
    let mut rng = api_state
        .rng
        .lock()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let id = sim.spawn_tip_at(&mut *rng, position);
    Ok(Json(SpawnResponse { id }))
}

// POST /resources - Spawn a resource at {x, y}
async fn spawn_resource(
    State(api_state): State<ApiState>,
    Json(req): Json<SpawnRequest>,
) -> Result<Json<SpawnResponse>, StatusCode> {
    let mut sim = api_state
        .simulation
        .lock()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let position = Vec2::new(req.x, req.y);
    if !sim.config.contains(position) {
        return Err(StatusCode::BAD_REQUEST);
    }
    let id = sim.spawn_resource_at(position);
    Ok(Json(SpawnResponse { id }))
}

// Create the API router
pub fn create_router(api_state: ApiState) -> Router {
    Router::new()
        .route("/state", get(get_state))
        .route("/stats", get(get_stats))
        .route("/step", post(step_simulation))
        .route("/reset", post(reset_simulation))
        .route("/pause", post(pause_simulation))
        .route("/config", get(get_config))
        .route("/neighbours", get(get_neighbours))
        .route("/tips", post(spawn_tip))
        .route("/resources", post(spawn_resource))
        .layer(CorsLayer::permissive())
        .with_state(api_state)
}

// Run the API server with automatic simulation stepping
pub async fn run_server(api_state: ApiState, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(api_state.clone());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    log::info!("Headless API server running on http://localhost:{}", port);
    log::info!("  GET  /state  - Segments, resources and stats");
    log::info!("  GET  /stats  - Colony statistics");
    log::info!(
        "  POST /step?steps=N - Step simulation N times (default: 1, max: {})",
        MAX_STEPS_PER_REQUEST
    );
    log::info!("  POST /reset - Reset simulation");
    log::info!("  POST /pause - Toggle pause");
    log::info!("  GET  /config - Simulation configuration");
    log::info!("  GET  /neighbours?x=X&y=Y&radius=R - Spatial index query");
    log::info!("  POST /tips, /resources - Spawn at JSON {{x, y}}");

    // Spawn background task to continuously step the simulation
    let simulation_task = tokio::spawn(simulation_loop(api_state.clone()));

    // Run the server
    let server_handle = tokio::spawn(async move { axum::serve(listener, app).await });

    // Wait for either task to complete
    tokio::select! {
        result = server_handle => {
            result??;
        }
        _ = simulation_task => {
            log::error!("Simulation loop ended unexpectedly");
        }
    }

    Ok(())
}

// Background task that continuously steps the simulation
async fn simulation_loop(api_state: ApiState) {
    // Target FPS for headless mode (similar to UI mode)
    const TARGET_FPS: f32 = 60.0;
    let frame_duration = std::time::Duration::from_secs_f32(1.0 / TARGET_FPS);

    loop {
        let start = std::time::Instant::now();

        {
            let mut sim = match api_state.simulation.lock() {
                Ok(sim) => sim,
                Err(_) => break,
            };
            let mut rng = match api_state.rng.lock() {
                Ok(rng) => rng,
                Err(_) => break,
            };
            let frame_dt = sim.config.headless_frame_dt;
            sim.advance(&mut *rng, frame_dt);
        }

        // Sleep to maintain target FPS
        let elapsed = start.elapsed();
        if elapsed < frame_duration {
            tokio::time::sleep(frame_duration - elapsed).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::rand::SeedableRng;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn state() -> ApiState {
        let mut rng = StdRng::seed_from_u64(8);
        let sim = Simulation::with_config(&mut rng, SimulationConfig::default());
        ApiState::new(sim, rng)
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    #[tokio::test]
    async fn stats_reports_initial_tip() {
        let app = create_router(state());
        let response = app
            .oneshot(Request::get("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["active_tips"], 1);
        assert_eq!(body["frame_index"], 0);
    }

    #[tokio::test]
    async fn step_advances_frames() {
        let app = create_router(state());
        let response = app
            .oneshot(post_json("/step?steps=5", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["stats"]["frame_index"], 5);
        assert!(body["segments"].as_array().is_some_and(|s| !s.is_empty()));
    }

    #[tokio::test]
    async fn step_rejects_oversized_batches() {
        let api_state = state();
        let app = create_router(api_state.clone());
        let response = app
            .oneshot(post_json("/step?steps=10001", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(api_state.simulation.lock().unwrap().frame_index, 0);
    }

    #[tokio::test]
    async fn spawn_endpoints_add_entities() {
        let api_state = state();
        let app = create_router(api_state.clone());

        let response = app
            .clone()
            .oneshot(post_json("/resources", r#"{"x": 400.0, "y": 300.0}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["id"], 0);

        let response = app
            .oneshot(post_json("/tips", r#"{"x": 100.0, "y": 100.0}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["id"], 1);

        let stats = api_state.simulation.lock().unwrap().stats();
        assert_eq!(stats.active_tips, 2);
        assert_eq!(stats.resources, 1);
        assert_eq!(stats.indexed_points, 3);
    }

    #[tokio::test]
    async fn spawn_outside_domain_is_rejected() {
        let app = create_router(state());
        let response = app
            .oneshot(post_json("/tips", r#"{"x": -5.0, "y": 100.0}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn neighbours_lists_index_entries() {
        let app = create_router(state());
        let response = app
            .oneshot(
                Request::get("/neighbours?x=960&y=540&radius=10")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body.as_array().map(Vec::len), Some(1));
        assert_eq!(body[0]["occupant"]["Tip"], 0);
    }

    #[tokio::test]
    async fn neighbours_with_overflowing_box_keeps_server_usable() {
        let api_state = state();
        let app = create_router(api_state.clone());
        let response = app
            .clone()
            .oneshot(
                Request::get("/neighbours?x=3e38&y=10&radius=1e38")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!api_state.simulation.is_poisoned());

        let response = app
            .oneshot(Request::get("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn pause_toggles() {
        let app = create_router(state());
        let response = app.oneshot(post_json("/pause", "")).await.unwrap();
        assert_eq!(json_body(response).await["paused"], true);
    }
}
