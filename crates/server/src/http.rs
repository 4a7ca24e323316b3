//! HTTP endpoints

use axum::{
    extract::{Json, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Form, Router,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use driver_assist_adapters::carrier_answer_document;
use driver_assist_config::PromptKind;
use driver_assist_core::{Error, Language};

use crate::state::AppState;
use crate::websocket::media_stream_ws;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(
        &state.settings.server.cors_origins,
        state.settings.server.cors_enabled,
    );

    Router::new()
        .route("/chat", post(chat))
        .route("/health", get(health))
        .route("/voice/process", post(process_voice))
        .route("/telephony/voice", post(telephony_voice))
        .route("/telephony/media-stream-ws", get(media_stream_ws))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS from configured origins; permissive only when disabled
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "invalid CORS origin ignored");
                None
            }
        })
        .collect();

    if parsed.is_empty() {
        tracing::info!("no CORS origins configured, defaulting to localhost:3000");
        return CorsLayer::new()
            .allow_origin(HeaderValue::from_static("http://localhost:3000"))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any);
    }

    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Map the error taxonomy onto HTTP statuses
///
/// Recoverable adapter errors never reach here (the orchestrator turns them
/// into replies); what remains is caller error or a genuine failure.
fn error_response(err: Error) -> (StatusCode, Json<serde_json::Value>) {
    let status = match &err {
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::SessionTerminal { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "detail": err.to_string() })))
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    conversation_id: String,
    text: String,
    language: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    text: String,
    should_end: bool,
    needs_escalation: bool,
}

/// Text chat turn
async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<serde_json::Value>)> {
    let language = match request.language.as_deref() {
        None => None,
        Some(tag) => Some(Language::parse(tag).ok_or_else(|| {
            error_response(Error::InvalidInput(format!("unsupported language: {tag}")))
        })?),
    };

    match state
        .orchestrator
        .handle_text(&request.conversation_id, &request.text, language)
        .await
    {
        Ok(result) => Ok(Json(ChatResponse {
            text: result.reply_text,
            should_end: result.should_end,
            needs_escalation: result.needs_escalation,
        })),
        Err(e) => {
            tracing::error!(session_id = %request.conversation_id, error = %e, "chat turn failed");
            Err(error_response(e))
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

#[derive(Debug, Deserialize)]
struct VoiceRequest {
    conversation_id: String,
    /// Base64-encoded PCM16 audio
    audio_data: String,
    language: Option<String>,
}

#[derive(Debug, Serialize)]
struct VoiceResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    transcribed_text: Option<String>,
    response_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio: Option<String>,
    proactive_prompt: bool,
    should_end: bool,
    needs_escalation: bool,
}

/// Single-shot voice turn
async fn process_voice(
    State(state): State<AppState>,
    Json(request): Json<VoiceRequest>,
) -> Result<Json<VoiceResponse>, (StatusCode, Json<serde_json::Value>)> {
    let language = match request.language.as_deref() {
        None => Language::En,
        Some(tag) => Language::parse(tag).ok_or_else(|| {
            error_response(Error::InvalidInput(format!("unsupported language: {tag}")))
        })?,
    };

    let pcm = base64::engine::general_purpose::STANDARD
        .decode(&request.audio_data)
        .map_err(|_| error_response(Error::InvalidInput("audio_data is not valid base64".to_string())))?;

    match state
        .gateway
        .process_clip(&request.conversation_id, &pcm, language)
        .await
    {
        Ok(output) => {
            let audio = output
                .audio
                .map(|clip| base64::engine::general_purpose::STANDARD.encode(clip.to_pcm16()));
            Ok(Json(VoiceResponse {
                transcribed_text: output.transcribed_text,
                response_text: output.response_text,
                audio,
                proactive_prompt: output.proactive_prompt,
                should_end: output.should_end,
                needs_escalation: output.needs_escalation,
            }))
        }
        Err(e) => {
            tracing::error!(session_id = %request.conversation_id, error = %e, "voice turn failed");
            Err(error_response(e))
        }
    }
}

#[derive(Debug, Deserialize)]
struct TelephonyCallForm {
    #[serde(rename = "CallSid")]
    call_sid: Option<String>,
    #[serde(rename = "From")]
    from: Option<String>,
}

/// Incoming-call webhook: answer with greet-and-gather instructions
async fn telephony_voice(
    State(state): State<AppState>,
    Form(form): Form<TelephonyCallForm>,
) -> impl IntoResponse {
    let call_sid = form.call_sid.unwrap_or_else(|| "unknown".to_string());
    tracing::info!(
        call_sid = %call_sid,
        from = form.from.as_deref().unwrap_or("unknown"),
        "incoming call"
    );

    let greeting = state
        .prompts
        .pick(PromptKind::Greeting, Language::En.code(), &call_sid, 0);
    let stream_url = format!(
        "{}/telephony/media-stream-ws",
        state
            .settings
            .server
            .public_url
            .replacen("http", "ws", 1)
            .trim_end_matches('/')
    );
    let document = carrier_answer_document(&greeting, &stream_url);

    (
        [(header::CONTENT_TYPE, "application/xml")],
        document,
    )
}
