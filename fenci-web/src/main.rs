//! Servidor Axum que expõe o motor fenci-core como API JSON.
//!
//! Configuração por variáveis de ambiente:
//!
//! - `FENCI_ADDR`: endereço de escuta (padrão `0.0.0.0:3000`)
//! - `FENCI_CONFIG`: caminho de um JSON com a [`EngineConfig`]
//! - `RUST_LOG`: filtro do tracing (padrão `info`)
//!
//! Todos os endpoints de corte usam HMM quando o pedido não diz o contrário
//! (`"mode": "hmm"` em `/segment`, `"hmm": true` nos demais).

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use fenci_core::{CutMode, Engine, EngineConfig, FenciError, KeywordMethod, TokenizeMode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_TOP_K: usize = 20;

/// Estado compartilhado da aplicação
struct AppState {
    engine: Engine,
}

/// Configuração do processo, lida do ambiente
#[derive(Debug)]
struct ServerConfig {
    addr: String,
    engine: EngineConfig,
}

impl ServerConfig {
    fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let addr = std::env::var("FENCI_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
        let engine = match std::env::var("FENCI_CONFIG") {
            Ok(path) => {
                let json = std::fs::read_to_string(&path)?;
                info!("Configuração carregada de {}", path);
                EngineConfig::from_json(&json)?
            }
            Err(_) => EngineConfig::default(),
        };
        Ok(Self { addr, engine })
    }
}

#[derive(Deserialize)]
struct SegmentRequest {
    text: String,
    #[serde(default = "default_cut_mode")]
    mode: CutMode,
}

#[derive(Deserialize)]
struct HmmRequest {
    text: String,
    #[serde(default = "default_hmm")]
    hmm: bool,
}

#[derive(Deserialize)]
struct TokenizeRequest {
    text: String,
    #[serde(default)]
    mode: TokenizeMode,
    #[serde(default = "default_hmm")]
    hmm: bool,
}

#[derive(Deserialize)]
struct KeywordsRequest {
    text: String,
    #[serde(default = "default_top_k")]
    top_k: usize,
    #[serde(default)]
    allowed_tags: Vec<String>,
    #[serde(default)]
    method: KeywordMethod,
}

#[derive(Deserialize)]
struct AddWordRequest {
    word: String,
    #[serde(default)]
    frequency: Option<u64>,
    #[serde(default)]
    tag: Option<String>,
}

#[derive(Deserialize)]
struct SuggestQuery {
    word: String,
}

#[derive(Serialize)]
struct FrequencyResponse {
    frequency: u64,
}

fn default_hmm() -> bool {
    true
}

fn default_cut_mode() -> CutMode {
    CutMode::Hmm
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

/// Erros devolvidos ao cliente como `{"error": "..."}`
enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl From<FenciError> for ApiError {
    fn from(err: FenciError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => {
                error!("Falha interna: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env()?;
    let engine = tokio::task::spawn_blocking(move || Engine::with_config(config.engine)).await?;
    let state = Arc::new(AppState { engine });

    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    info!("🚀 Servidor fenci iniciado em http://{}", config.addr);
    axum::serve(listener, app(state)).await?;
    Ok(())
}

fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/segment", post(segment_handler))
        .route("/segment/search", post(search_handler))
        .route("/tag", post(tag_handler))
        .route("/tokenize", post(tokenize_handler))
        .route("/keywords", post(keywords_handler))
        .route("/lexicon/words", post(add_word_handler))
        .route("/lexicon/merge", post(merge_handler))
        .route("/lexicon/reset", post(reset_handler))
        .route("/lexicon/suggest", get(suggest_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Roda o trabalho de CPU fora do runtime assíncrono
async fn run_blocking<T, F>(state: Arc<AppState>, work: F) -> Result<T, ApiError>
where
    F: FnOnce(&Engine) -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || work(&state.engine))
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn segment_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SegmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let segments = run_blocking(state, move |engine| engine.segment_with_mode(&req.text, req.mode)).await?;
    Ok(Json(segments))
}

async fn search_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HmmRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let segments = run_blocking(state, move |engine| engine.segment_for_search(&req.text, req.hmm)).await?;
    Ok(Json(segments))
}

async fn tag_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HmmRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tagged = run_blocking(state, move |engine| engine.tag(&req.text, req.hmm)).await?;
    Ok(Json(tagged))
}

async fn tokenize_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TokenizeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tokens = run_blocking(state, move |engine| engine.tokenize(&req.text, req.mode, req.hmm)).await?;
    Ok(Json(tokens))
}

async fn keywords_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<KeywordsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Extraindo palavras-chave [{:?}]: {} chars", req.method, req.text.chars().count());
    let keywords = run_blocking(state, move |engine| {
        engine.extract_keywords(&req.text, req.top_k, &req.allowed_tags, req.method)
    })
    .await?;
    Ok(Json(keywords))
}

async fn add_word_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddWordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.word.trim().is_empty() {
        return Err(ApiError::BadRequest("Palavra vazia".to_string()));
    }
    let frequency = run_blocking(state, move |engine| {
        engine.add_word(&req.word, req.frequency, req.tag.as_deref())
    })
    .await??;
    Ok(Json(FrequencyResponse { frequency }))
}

async fn merge_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Result<impl IntoResponse, ApiError> {
    let report = run_blocking(state, move |engine| engine.merge_dictionary(&body)).await??;
    Ok(Json(report))
}

async fn reset_handler(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    run_blocking(state, |engine| engine.reset_lexicon()).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn suggest_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SuggestQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let frequency = run_blocking(state, move |engine| engine.suggest_frequency(&query.word)).await?;
    Ok(Json(FrequencyResponse { frequency }))
}
