//! HTTP API server.
//!
//! JSON endpoints for generating speech from a URL or an uploaded clip,
//! preparing reusable reference clips, and downloading generated audio.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::{PipelineFailure, Stage, VoicecastError};
use crate::orchestrator::{
    GenerateRequest, GeneratedSpeech, Orchestrator, PreparedReference, SynthesisMode,
};
use crate::source::{
    check_audio_size, content_type_for, SourceIdentity, SourceReference, UploadedAudio,
};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

/// Multipart overhead allowed on top of the upload limit.
const MULTIPART_SLACK_BYTES: usize = 1 << 20;

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let body_limit = settings.pipeline.max_upload_bytes + MULTIPART_SLACK_BYTES;
    let orchestrator = Orchestrator::new(settings)?;

    let state = Arc::new(AppState { orchestrator });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/generate", post(generate))
        .route("/generate/upload", post(generate_upload))
        .route("/prepare", post(prepare))
        .route("/synthesize", post(synthesize))
        .route("/audio/{file_name}", get(audio))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Voicecast API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Generate", "POST /generate");
    Output::kv("Generate (upload)", "POST /generate/upload");
    Output::kv("Prepare", "POST /prepare");
    Output::kv("Synthesize", "POST /synthesize");
    Output::kv("Audio", "GET  /audio/{file_name}");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct GenerateBody {
    url: String,
    text: String,
    #[serde(default)]
    mode: Option<SynthesisMode>,
}

#[derive(Deserialize)]
struct PrepareBody {
    url: String,
}

#[derive(Deserialize)]
struct SynthesizeBody {
    identity: SourceIdentity,
    audio_url: String,
    reference_text: String,
    text: String,
}

#[derive(Serialize)]
struct SpeechResponse {
    success: bool,
    identity: String,
    file_name: String,
    audio_url: String,
}

impl From<GeneratedSpeech> for SpeechResponse {
    fn from(speech: GeneratedSpeech) -> Self {
        Self {
            success: true,
            audio_url: format!("/audio/{}", speech.file_name),
            identity: speech.identity.to_string(),
            file_name: speech.file_name,
        }
    }
}

#[derive(Serialize)]
struct PrepareResponse {
    success: bool,
    #[serde(flatten)]
    prepared: PreparedReference,
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<Stage>,
    error: String,
}

fn status_for(error: &VoicecastError) -> StatusCode {
    match error {
        VoicecastError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        VoicecastError::ToolUnavailable(_)
        | VoicecastError::StoreUnavailable(_)
        | VoicecastError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        VoicecastError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: VoicecastError) -> Response {
    (
        status_for(&error),
        Json(ErrorResponse {
            success: false,
            stage: None,
            error: error.to_string(),
        }),
    )
        .into_response()
}

fn failure_response(failure: PipelineFailure) -> Response {
    warn!("Request failed: {}", failure);
    (
        status_for(&failure.error),
        Json(ErrorResponse {
            success: false,
            stage: Some(failure.stage),
            error: failure.error.to_string(),
        }),
    )
        .into_response()
}

fn speech_response(result: Result<GeneratedSpeech, PipelineFailure>) -> Response {
    match result {
        Ok(speech) => Json(SpeechResponse::from(speech)).into_response(),
        Err(failure) => failure_response(failure),
    }
}

/// Plain file names only: no separators, no parent references, no hidden files.
fn is_servable_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && !name.contains("..")
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn generate(State(state): State<Arc<AppState>>, Json(body): Json<GenerateBody>) -> Response {
    let mode = body
        .mode
        .unwrap_or(state.orchestrator.settings().synthesis.default_mode);

    speech_response(
        state
            .orchestrator
            .generate(GenerateRequest {
                reference: SourceReference::Url(body.url),
                text: body.text,
                mode,
            })
            .await,
    )
}

/// Multipart fields: `audio-file` or `recording`, `text`, optional `mode`.
async fn generate_upload(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let settings = state.orchestrator.settings();
    let mut reference = None;
    let mut text = None;
    let mut mode = settings.synthesis.default_mode;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return error_response(VoicecastError::InvalidInput(format!(
                    "Error parsing form: {}",
                    e
                )))
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "audio-file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = match field.bytes().await {
                    Ok(b) => b,
                    Err(e) => {
                        return error_response(VoicecastError::InvalidInput(format!(
                            "Error reading uploaded file: {}",
                            e
                        )))
                    }
                };
                match UploadedAudio::new(
                    bytes.to_vec(),
                    &file_name,
                    content_type.as_deref(),
                    settings.pipeline.max_upload_bytes,
                ) {
                    Ok(upload) => reference = Some(SourceReference::Upload(upload)),
                    Err(e) => return error_response(e),
                }
            }
            "recording" => match field.bytes().await {
                Ok(b) => match recording_reference(&b, settings.pipeline.max_upload_bytes) {
                    Ok(r) => reference = Some(r),
                    Err(e) => return error_response(e),
                },
                Err(e) => {
                    return error_response(VoicecastError::InvalidInput(format!(
                        "Error reading recording: {}",
                        e
                    )))
                }
            },
            "text" => match field.text().await {
                Ok(t) => text = Some(t),
                Err(e) => {
                    return error_response(VoicecastError::InvalidInput(format!(
                        "Error reading text: {}",
                        e
                    )))
                }
            },
            "mode" => {
                let value = field.text().await.unwrap_or_default();
                match value.parse::<SynthesisMode>() {
                    Ok(m) => mode = m,
                    Err(e) => return error_response(VoicecastError::InvalidInput(e)),
                }
            }
            _ => {}
        }
    }

    let Some(reference) = reference else {
        return error_response(VoicecastError::InvalidInput(
            "No audio file or recording provided".into(),
        ));
    };

    speech_response(
        state
            .orchestrator
            .generate(GenerateRequest {
                reference,
                text: text.unwrap_or_default(),
                mode,
            })
            .await,
    )
}

async fn prepare(State(state): State<Arc<AppState>>, Json(body): Json<PrepareBody>) -> Response {
    match state
        .orchestrator
        .prepare_reference(&SourceReference::Url(body.url))
        .await
    {
        Ok(prepared) => Json(PrepareResponse {
            success: true,
            prepared,
        })
        .into_response(),
        Err(failure) => failure_response(failure),
    }
}

async fn synthesize(State(state): State<Arc<AppState>>, Json(body): Json<SynthesizeBody>) -> Response {
    if body.audio_url.trim().is_empty() || body.reference_text.trim().is_empty() {
        return error_response(VoicecastError::InvalidInput(
            "Missing required parameters: audio_url or reference_text".into(),
        ));
    }

    let prepared = PreparedReference {
        identity: body.identity,
        audio_url: body.audio_url,
        reference_text: body.reference_text,
    };

    speech_response(
        state
            .orchestrator
            .synthesize_prepared(&prepared, &body.text)
            .await,
    )
}

async fn audio(State(state): State<Arc<AppState>>, Path(file_name): Path<String>) -> Response {
    if !is_servable_file_name(&file_name) {
        return error_response(VoicecastError::InvalidInput("Invalid file name".into()));
    }

    let path = state.orchestrator.output_dir().join(&file_name);
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("mp3");
            ([(header::CONTENT_TYPE, content_type_for(extension))], bytes).into_response()
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                success: false,
                stage: None,
                error: format!("Audio not found: {}", file_name),
            }),
        )
            .into_response(),
        Err(e) => error_response(e.into()),
    }
}

/// Browser recordings carry no file name, only the size limit applies.
fn recording_reference(bytes: &[u8], max_bytes: usize) -> crate::Result<SourceReference> {
    check_audio_size(bytes.len(), max_bytes)?;
    Ok(SourceReference::Recording(bytes.to_vec()))
}
