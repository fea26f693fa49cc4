/// API сервер модели трудозатрат

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};

use labor_ml::{
    pricing::{build_matrix, PricingOptions, PricingRow},
    train, FittedPipeline, JobFeatures, LaborHoursPipeline, ModelError, PredictionInterval,
    ProductionRates, RawRecord, ServerConfig, TrainingConfig, TrainingReport,
};

/// Последняя обученная модель вместе с данными, на которых она обучена
struct TrainedModel {
    records: Vec<RawRecord>,
    config: TrainingConfig,
    fitted: FittedPipeline,
    rates: Option<ProductionRates>,
}

#[derive(Clone)]
struct AppState {
    defaults: Arc<TrainingConfig>,
    model: Arc<RwLock<Option<Arc<TrainedModel>>>>,
}

impl AppState {
    async fn current(&self) -> Result<Arc<TrainedModel>, ApiError> {
        self.model
            .read()
            .await
            .clone()
            .ok_or(ApiError::Model(ModelError::NotFitted("LaborHoursPipeline")))
    }
}

enum ApiError {
    Model(ModelError),
    Internal(String),
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        ApiError::Model(err)
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Model(err) => {
                let (status, code) = match &err {
                    ModelError::NotFitted(_) => (StatusCode::CONFLICT, "not_fitted"),
                    ModelError::DimensionMismatch { .. } => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "dimension_mismatch")
                    }
                    ModelError::InvalidConfig(_) => (StatusCode::BAD_REQUEST, "invalid_config"),
                    ModelError::InsufficientData { .. } => {
                        (StatusCode::BAD_REQUEST, "insufficient_data")
                    }
                    ModelError::Serialization(_) => {
                        (StatusCode::BAD_REQUEST, "serialization_error")
                    }
                    ModelError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
                };
                (status, code, err.to_string())
            }
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            }
        };

        tracing::warn!("Request failed ({}): {}", status, message);
        (status, Json(serde_json::json!({ "error": code, "message": message }))).into_response()
    }
}

#[derive(Deserialize)]
struct TrainRequest {
    records: Vec<RawRecord>,
    #[serde(default)]
    config: Option<TrainingConfig>,
}

#[derive(Serialize)]
struct PredictResponse {
    labor_hours: f64,
    rate_check_hours: Option<f64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Инициализация логирования
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ServerConfig::from_env().context("failed to load server config")?;

    let state = AppState {
        defaults: Arc::new(config.training),
        model: Arc::new(RwLock::new(None)),
    };

    // CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/train", post(train_model))
        .route("/api/predict", post(predict))
        .route("/api/predict-interval", post(predict_interval))
        .route("/api/pricing-matrix", post(pricing_matrix))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    tracing::info!("Server listening on http://{}", config.addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Labor ML API (Rust)",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let trained = state.model.read().await.is_some();
    Json(serde_json::json!({ "status": "ok", "model_trained": trained }))
}

async fn train_model(
    State(state): State<AppState>,
    Json(request): Json<TrainRequest>,
) -> Result<Json<TrainingReport>, ApiError> {
    tracing::info!("Train request: {} records", request.records.len());

    let config = match request.config {
        Some(config) => {
            config.validate()?;
            config
        }
        None => (*state.defaults).clone(),
    };

    // CV и обучение - CPU работа, вне async потоков
    let (trained, report) = tokio::task::spawn_blocking(move || {
        let (fitted, report) = train(&request.records, &config)?;
        let rates = ProductionRates::learn(&request.records);
        let trained = TrainedModel {
            records: request.records,
            config,
            fitted,
            rates,
        };
        Ok::<_, ModelError>((trained, report))
    })
    .await??;

    *state.model.write().await = Some(Arc::new(trained));
    Ok(Json(report))
}

async fn predict(
    State(state): State<AppState>,
    Json(job): Json<JobFeatures>,
) -> Result<Json<PredictResponse>, ApiError> {
    let trained = state.current().await?;
    let labor_hours = trained.fitted.predict(&job)?;
    let rate_check_hours = trained.rates.as_ref().and_then(|r| r.estimate_hours(&job));

    Ok(Json(PredictResponse {
        labor_hours,
        rate_check_hours,
    }))
}

async fn predict_interval(
    State(state): State<AppState>,
    Json(job): Json<JobFeatures>,
) -> Result<Json<PredictionInterval>, ApiError> {
    let trained = state.current().await?;
    let estimator = trained.config.bootstrap.estimator()?;

    let interval = tokio::task::spawn_blocking(move || {
        let pipeline = LaborHoursPipeline::from_config(&trained.config)?;
        estimator.predict_interval(&pipeline, &trained.records, &job)
    })
    .await??;

    Ok(Json(interval))
}

async fn pricing_matrix(
    State(state): State<AppState>,
    Json(options): Json<PricingOptions>,
) -> Result<Json<Vec<PricingRow>>, ApiError> {
    let trained = state.current().await?;

    let rows = tokio::task::spawn_blocking(move || {
        build_matrix(&trained.fitted, trained.rates.as_ref(), &options)
    })
    .await??;

    Ok(Json(rows))
}
