use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

/// Speech engine used on both sides of the relay; recognition and synthesis
/// run in the browser.
const BROWSER_SPEECH_ENGINE: &str = "Web Speech API";

/// Health check response body
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub mode: &'static str,
    pub stt: &'static str,
    pub tts: &'static str,
    pub ai: String,
}

/// `GET /health`
///
/// Reports which reply path is active: the configured model through the
/// completion endpoint, or local fallback replies.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let completion = state.responder.config();
    let ai = if completion.is_enabled() {
        format!("{} via completion API", completion.model)
    } else {
        "Fallback responses".to_string()
    };

    Json(HealthResponse {
        status: "ok",
        mode: "browser-stt-tts",
        stt: BROWSER_SPEECH_ENGINE,
        tts: BROWSER_SPEECH_ENGINE,
        ai,
    })
}
