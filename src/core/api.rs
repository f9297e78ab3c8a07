//! HTTP + WebSocket API for the presentation layer
//!
//! Endpoints:
//! - GET /health - Health check
//! - GET /session - Current session view
//! - POST /session/start - Start gesture ({ratio} or {x, width})
//! - POST /session/reset - Reset / cancel
//! - POST /calibrate - Start a calibration capture
//! - WS /ws - Live session views
//!
//! One controller per process sits behind a single mutex. Every transition
//! and every frame poll takes that lock, so back-to-back gestures cannot
//! double-start a session.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{State, WebSocketUpgrade, ws::{Message, WebSocket}},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::core::controller::SessionController;
use crate::core::gesture::GesturePosition;
use crate::types::{SessionPhase, SessionView};
use crate::Result;

/// Shared app state
pub struct AppState {
    pub session: Mutex<SessionController>,
    pub updates: broadcast::Sender<SessionView>,
}

impl AppState {
    pub fn new(controller: SessionController) -> Arc<Self> {
        let (updates, _) = broadcast::channel(64);
        Arc::new(Self {
            session: Mutex::new(controller),
            updates,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionView> {
        self.updates.subscribe()
    }

    /// One frame: poll the controller and return the resulting view
    pub async fn tick(&self) -> SessionView {
        let mut session = self.session.lock().await;
        session.poll();
        session.view()
    }

    fn publish(&self, view: &SessionView) {
        // No subscribers is fine
        let _ = self.updates.send(view.clone());
    }
}

/// Decides which frame views reach subscribers.
///
/// State changes (phase, status, verdict, reason, baseline, notice) pass at
/// once. Views that only move the meter pass at most once per `meter_interval`.
#[derive(Debug)]
pub struct ViewGate {
    meter_interval: Duration,
    last: Option<SessionView>,
    last_sent: Option<Instant>,
}

impl ViewGate {
    pub fn new(meter_interval: Duration) -> Self {
        Self {
            meter_interval,
            last: None,
            last_sent: None,
        }
    }

    /// True if `view` should be published; records it as sent
    pub fn admit(&mut self, view: &SessionView, now: Instant) -> bool {
        let admit = match (&self.last, self.last_sent) {
            (Some(prev), Some(sent)) => {
                if !prev.same_state(view) {
                    true
                } else if prev.same_content(view) {
                    false
                } else {
                    now.saturating_duration_since(sent) >= self.meter_interval
                }
            }
            _ => true,
        };
        if admit {
            self.last = Some(view.clone());
            self.last_sent = Some(now);
        }
        admit
    }
}

/// Drive `poll()` at the configured frame rate, publishing views the gate admits
pub fn spawn_frame_driver(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = state.session.lock().await.frame_interval();
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut gate = ViewGate::new(Duration::from_millis(crate::METER_INTERVAL_MS));

        loop {
            interval.tick().await;
            let view = state.tick().await;
            if gate.admit(&view, Instant::now()) {
                state.publish(&view);
            }
        }
    })
}

/// Start gesture body: either a ratio or a pointer offset and control width
#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub ratio: Option<f64>,
    pub x: Option<f64>,
    pub width: Option<f64>,
}

impl StartRequest {
    pub fn position(&self) -> Option<GesturePosition> {
        match (self.ratio, self.x, self.width) {
            (Some(ratio), _, _) => GesturePosition::from_ratio(ratio),
            (None, Some(x), Some(width)) => GesturePosition::from_offset(x, width),
            _ => None,
        }
    }
}

/// Result of a user-triggered transition
#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    /// False when the transition was ignored (session busy, already idle)
    pub accepted: bool,
    #[serde(flatten)]
    pub view: SessionView,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub phase: SessionPhase,
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/session", get(get_session))
        .route("/session/start", post(start_session))
        .route("/session/reset", post(reset_session))
        .route("/calibrate", post(calibrate))
        .route("/ws", get(websocket_handler))
        .with_state(state)
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let session = state.session.lock().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        phase: session.phase(),
    })
}

/// Get current view
async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionView> {
    let session = state.session.lock().await;
    Json(session.view())
}

/// Start gesture
async fn start_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StartRequest>,
) -> std::result::Result<Json<TransitionResponse>, StatusCode> {
    let position = req.position().ok_or(StatusCode::BAD_REQUEST)?;

    let mut session = state.session.lock().await;
    let accepted = session.start(position);
    let view = session.view();
    drop(session);

    if accepted {
        state.publish(&view);
    }
    Ok(Json(TransitionResponse { accepted, view }))
}

/// Reset from a result, or cancel a running phase
async fn reset_session(State(state): State<Arc<AppState>>) -> Json<TransitionResponse> {
    let mut session = state.session.lock().await;
    let accepted = session.reset();
    let view = session.view();
    drop(session);

    if accepted {
        state.publish(&view);
    }
    Json(TransitionResponse { accepted, view })
}

/// Start calibration
async fn calibrate(State(state): State<Arc<AppState>>) -> Json<TransitionResponse> {
    let mut session = state.session.lock().await;
    let accepted = session.calibrate();
    let view = session.view();
    drop(session);

    if accepted {
        state.publish(&view);
    }
    Json(TransitionResponse { accepted, view })
}

/// WebSocket handler for live updates
async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let rx = state.subscribe();
    let current = state.session.lock().await.view();
    ws.on_upgrade(move |socket| handle_websocket(socket, current, rx))
}

/// Push views until the client goes away. Inbound messages are ignored;
/// transitions go through the HTTP endpoints.
async fn handle_websocket(socket: WebSocket, current: SessionView, mut rx: broadcast::Receiver<SessionView>) {
    let (mut sender, mut receiver) = socket.split();

    let mut forward = tokio::spawn(async move {
        let json = serde_json::to_string(&current).unwrap_or_default();
        if sender.send(Message::Text(json)).await.is_err() {
            return;
        }
        loop {
            match rx.recv().await {
                Ok(view) => {
                    let json = serde_json::to_string(&view).unwrap_or_default();
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "websocket client lagging");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut inbound = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            if matches!(message, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut forward => inbound.abort(),
        _ = &mut inbound => forward.abort(),
    }
}

/// Run the API server with its frame driver
pub async fn run_server(addr: &str, controller: SessionController) -> Result<()> {
    let state = AppState::new(controller);
    let driver = spawn_frame_driver(state.clone());
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Polygraph API running on {}", addr);
    info!("  GET  /health         - Health check");
    info!("  GET  /session        - Current view");
    info!("  POST /session/start  - Start gesture");
    info!("  POST /session/reset  - Reset / cancel");
    info!("  POST /calibrate      - Calibrate baseline");
    info!("  WS   /ws             - Live updates");

    let served = axum::serve(listener, router).await;
    driver.abort();
    served?;
    Ok(())
}
