//! REST API for the pallet optimizer.
//!
//! Provides HTTP endpoints for the planning frontend: stateless packing (also
//! as an SSE progress stream), catalog-backed load plans per delivery and the
//! management of pallet types and profile depths.
//! Uses Axum as the web framework and supports CORS.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{OpenApi, ToSchema};

use crate::config::ApiConfig;
use crate::model::{
    OptimizedPallet, OptimizedWindow, PalletDefinition, ProfileDepths, ValidationError,
    WindowInput,
};
use crate::optimizer::{
    self, OptimizationOptions, OptimizationOptionsPatch, OptimizationResult, OptimizationSummary,
    PreparedDelivery,
};
use crate::service::{
    DeliveryDimensionsSummary, OptimizationStatus, OptimizationValidation,
    PalletOptimizerService, ServiceError,
};
use crate::store::{NewPalletType, PalletType, PalletTypeUpdate, StoreError};

#[derive(Clone)]
struct ApiState {
    service: PalletOptimizerService,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>pallet-optimizer API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                window.ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                });
            };
        </script>
    </body>
</html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Request for stateless packing.
///
/// The catalog (profile depths and pallets) is sent along with the windows;
/// nothing is stored.
#[derive(Deserialize, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(
    example = json!({
        "deliveryId": 1,
        "windows": [
            {
                "id": 1,
                "orderId": 100,
                "orderNumber": "Z-001",
                "widthMm": 1000.0,
                "heightMm": 1500.0,
                "profileType": "AWS75",
                "quantity": 2
            }
        ],
        "profileDepths": { "AWS75": 100.0 },
        "pallets": [
            { "name": "Standard", "lengthMm": 2500.0, "maxLoadDepthMm": 1200.0, "maxOverhangMm": 700.0 }
        ],
        "options": { "allowSideBySide": false }
    })
)]
pub struct OptimizeRequest {
    #[serde(default)]
    pub delivery_id: u64,
    pub windows: Vec<WindowInput>,
    #[schema(value_type = Object)]
    pub profile_depths: ProfileDepths,
    pub pallets: Vec<PalletDefinition>,
    #[serde(default)]
    pub options: Option<OptimizationOptionsPatch>,
}

impl OptimizeRequest {
    fn into_prepared(
        self,
        defaults: OptimizationOptions,
    ) -> Result<PreparedDelivery, ValidationError> {
        let options = self
            .options
            .map_or(defaults, |patch| patch.apply_to(defaults));
        optimizer::prepare(
            self.delivery_id,
            &self.windows,
            &self.profile_depths,
            &self.pallets,
            &options,
        )
    }
}

/// Windows of a delivery, as collected from its orders.
#[derive(Deserialize, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryWindowsRequest {
    pub windows: Vec<WindowInput>,
    #[serde(default)]
    pub options: Option<OptimizationOptionsPatch>,
}

/// Dimension overview together with a rough pallet estimate.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliverySummaryResponse {
    pub summary: DeliveryDimensionsSummary,
    pub estimated_pallets: u64,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDepthRequest {
    pub depth_mm: f64,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDepthEntry {
    pub profile_type: String,
    pub depth_mm: f64,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn validation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        details,
    )
}

fn store_error(err: StoreError) -> Response {
    match err {
        StoreError::NotFound(entity) => {
            error_response(StatusCode::NOT_FOUND, "Not found", format!("{} not found", entity))
        }
        StoreError::Validation(err) => validation_error(err.to_string()),
        other => {
            tracing::error!("Storage failure: {}", other);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Storage error",
                other.to_string(),
            )
        }
    }
}

fn service_error(err: ServiceError) -> Response {
    match err {
        ServiceError::Validation(err) => validation_error(err.to_string()),
        ServiceError::NotReady(errors) => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Delivery not ready for optimization",
            errors.join(", "),
        ),
        ServiceError::Store(err) => store_error(err),
        ServiceError::TaskFailed(details) => {
            tracing::error!("Service task failed: {}", details);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal error", details)
        }
    }
}

fn parse_json<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    match payload {
        Ok(Json(payload)) => Ok(payload),
        Err(err) => Err(json_deserialize_error(err)),
    }
}

fn prepare_request(
    state: &ApiState,
    payload: Result<Json<OptimizeRequest>, JsonRejection>,
) -> Result<PreparedDelivery, Response> {
    let request = parse_json(payload)?;
    tracing::info!(
        delivery_id = request.delivery_id,
        positions = request.windows.len(),
        pallet_types = request.pallets.len(),
        "New optimize request"
    );
    request
        .into_prepared(state.service.default_options())
        .map_err(|err| validation_error(err.to_string()))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        handle_optimize,
        handle_optimize_stream,
        optimize_delivery,
        get_optimization,
        delete_optimization,
        optimization_status,
        validate_delivery,
        delivery_summary,
        list_pallet_types,
        create_pallet_type,
        get_pallet_type,
        update_pallet_type,
        delete_pallet_type,
        list_profile_depths,
        put_profile_depth,
        delete_profile_depth
    ),
    components(
        schemas(
            OptimizeRequest,
            DeliveryWindowsRequest,
            DeliverySummaryResponse,
            ProfileDepthRequest,
            ProfileDepthEntry,
            HealthResponse,
            ErrorResponse,
            WindowInput,
            PalletDefinition,
            OptimizationOptions,
            OptimizationOptionsPatch,
            OptimizationResult,
            OptimizationSummary,
            OptimizedPallet,
            OptimizedWindow,
            OptimizationStatus,
            OptimizationValidation,
            DeliveryDimensionsSummary,
            PalletType,
            NewPalletType,
            PalletTypeUpdate
        )
    ),
    tags(
        (name = "optimization", description = "Pallet load planning"),
        (name = "catalog", description = "Pallet types and profile depths")
    )
)]
struct ApiDoc;

/// Builds the application router.
pub fn router(service: PalletOptimizerService) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let state = ApiState { service };

    Router::new()
        .route("/health", get(health))
        // Stateless packing
        .route("/optimize", post(handle_optimize))
        .route("/optimize_stream", post(handle_optimize_stream))
        // Deliveries
        .route(
            "/deliveries/{id}/optimization",
            post(optimize_delivery)
                .get(get_optimization)
                .delete(delete_optimization),
        )
        .route(
            "/deliveries/{id}/optimization/status",
            get(optimization_status),
        )
        .route("/deliveries/{id}/validation", post(validate_delivery))
        .route("/deliveries/{id}/summary", post(delivery_summary))
        // Catalog
        .route(
            "/pallet-types",
            get(list_pallet_types).post(create_pallet_type),
        )
        .route(
            "/pallet-types/{id}",
            get(get_pallet_type)
                .put(update_pallet_type)
                .delete(delete_pallet_type),
        )
        .route("/profile-depths", get(list_profile_depths))
        .route(
            "/profile-depths/{profile_type}",
            put(put_profile_depth).delete(delete_profile_depth),
        )
        // API documentation
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server.
///
/// Configures CORS for cross-origin requests from the frontend.
/// Blocks until the server is terminated.
pub async fn start_api_server(
    config: ApiConfig,
    service: PalletOptimizerService,
) -> std::io::Result<()> {
    let app = router(service);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        "Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() && config.uses_default_host() {
        tracing::info!("Local access: http://localhost:{}", config.port());
    }
    tracing::info!("API endpoints: POST /optimize, POST /optimize_stream, /deliveries/{{id}}/...");
    tracing::info!("Catalog endpoints: /pallet-types, /profile-depths");
    tracing::info!("Documentation: GET /docs, GET /docs/openapi.json");

    axum::serve(listener, app).await
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is running", body = HealthResponse)),
    tag = "optimization"
)]
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handler for POST /optimize.
///
/// Packs the windows against the catalog sent in the request. Nothing is stored.
#[utoipa::path(
    post,
    path = "/optimize",
    request_body = OptimizeRequest,
    responses(
        (status = 200, description = "Load plan", body = OptimizationResult),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid windows, catalog or options", body = ErrorResponse)
    ),
    tag = "optimization"
)]
async fn handle_optimize(
    State(state): State<ApiState>,
    payload: Result<Json<OptimizeRequest>, JsonRejection>,
) -> Response {
    let prepared = match prepare_request(&state, payload) {
        Ok(prepared) => prepared,
        Err(response) => return response,
    };

    let packed = tokio::task::spawn_blocking(move || prepared.pack()).await;
    match packed {
        Ok(Ok(result)) => {
            tracing::info!(
                pallets = result.total_pallets,
                windows = result.summary.total_windows,
                "Optimize request packed"
            );
            (StatusCode::OK, Json(result)).into_response()
        }
        Ok(Err(err)) => validation_error(err.to_string()),
        Err(err) => service_error(ServiceError::TaskFailed(err.to_string())),
    }
}

/// Handler for POST /optimize_stream (SSE).
///
/// Input is validated before the stream starts; invalid requests get a regular
/// 422 response. Afterwards every packing step is sent as one event.
#[utoipa::path(
    post,
    path = "/optimize_stream",
    request_body = OptimizeRequest,
    responses(
        (
            status = 200,
            description = "Streams pack events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid windows, catalog or options", body = ErrorResponse)
    ),
    tag = "optimization"
)]
async fn handle_optimize_stream(
    State(state): State<ApiState>,
    payload: Result<Json<OptimizeRequest>, JsonRejection>,
) -> Response {
    let prepared = match prepare_request(&state, payload) {
        Ok(prepared) => prepared,
        Err(response) => return response,
    };

    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        let _ = prepared.pack_with_progress(|evt| {
            if let Ok(json) = serde_json::to_string(evt) {
                // A closed receiver only means the client went away.
                let _ = tx.blocking_send(json);
            }
        });
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/deliveries/{id}/optimization",
    params(("id" = u64, Path, description = "Delivery id")),
    request_body = DeliveryWindowsRequest,
    responses(
        (status = 200, description = "Saved load plan", body = OptimizationResult),
        (status = UNPROCESSABLE_ENTITY, description = "Delivery not ready or invalid windows", body = ErrorResponse)
    ),
    tag = "optimization"
)]
async fn optimize_delivery(
    State(state): State<ApiState>,
    Path(id): Path<u64>,
    payload: Result<Json<DeliveryWindowsRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let result = state
        .service
        .call(move |service| {
            service.optimize_delivery(id, &request.windows, request.options.as_ref())
        })
        .await;
    match result {
        Ok(result) => Json(result).into_response(),
        Err(err) => service_error(err),
    }
}

#[utoipa::path(
    get,
    path = "/deliveries/{id}/optimization",
    params(("id" = u64, Path, description = "Delivery id")),
    responses(
        (status = 200, description = "Saved load plan", body = OptimizationResult),
        (status = NOT_FOUND, description = "No load plan saved", body = ErrorResponse)
    ),
    tag = "optimization"
)]
async fn get_optimization(State(state): State<ApiState>, Path(id): Path<u64>) -> Response {
    match state.service.call(move |service| service.optimization(id)).await {
        Ok(Some(result)) => Json(result).into_response(),
        Ok(None) => store_error(StoreError::NotFound("Optimization")),
        Err(err) => service_error(err),
    }
}

#[utoipa::path(
    delete,
    path = "/deliveries/{id}/optimization",
    params(("id" = u64, Path, description = "Delivery id")),
    responses(
        (status = NO_CONTENT, description = "Load plan deleted"),
        (status = NOT_FOUND, description = "No load plan saved", body = ErrorResponse)
    ),
    tag = "optimization"
)]
async fn delete_optimization(State(state): State<ApiState>, Path(id): Path<u64>) -> Response {
    match state
        .service
        .call(move |service| service.delete_optimization(id))
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => service_error(err),
    }
}

#[utoipa::path(
    get,
    path = "/deliveries/{id}/optimization/status",
    params(("id" = u64, Path, description = "Delivery id")),
    responses((status = 200, description = "Load plan status", body = OptimizationStatus)),
    tag = "optimization"
)]
async fn optimization_status(State(state): State<ApiState>, Path(id): Path<u64>) -> Response {
    match state
        .service
        .call(move |service| service.optimization_status(id))
        .await
    {
        Ok(status) => Json(status).into_response(),
        Err(err) => service_error(err),
    }
}

#[utoipa::path(
    post,
    path = "/deliveries/{id}/validation",
    params(("id" = u64, Path, description = "Delivery id")),
    request_body = DeliveryWindowsRequest,
    responses((status = 200, description = "Readiness report", body = OptimizationValidation)),
    tag = "optimization"
)]
async fn validate_delivery(
    State(state): State<ApiState>,
    Path(id): Path<u64>,
    payload: Result<Json<DeliveryWindowsRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let report = state
        .service
        .call(move |service| {
            service.validate_for_optimization(&request.windows, request.options.as_ref())
        })
        .await;
    match report {
        Ok(report) => {
            tracing::debug!(delivery_id = id, valid = report.is_valid, "Validated delivery");
            Json(report).into_response()
        }
        Err(err) => service_error(err),
    }
}

#[utoipa::path(
    post,
    path = "/deliveries/{id}/summary",
    params(("id" = u64, Path, description = "Delivery id")),
    request_body = DeliveryWindowsRequest,
    responses((status = 200, description = "Dimensions and pallet estimate", body = DeliverySummaryResponse)),
    tag = "optimization"
)]
async fn delivery_summary(
    State(state): State<ApiState>,
    Path(id): Path<u64>,
    payload: Result<Json<DeliveryWindowsRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let summary = state
        .service
        .call(move |service| {
            let summary = service.dimensions_summary(id, &request.windows)?;
            let estimated_pallets = service.estimate_pallet_count(&request.windows)?;
            Ok(DeliverySummaryResponse {
                summary,
                estimated_pallets,
            })
        })
        .await;
    match summary {
        Ok(response) => Json(response).into_response(),
        Err(err) => service_error(err),
    }
}

#[utoipa::path(
    get,
    path = "/pallet-types",
    responses((status = 200, description = "Pallet types, longest first", body = [PalletType])),
    tag = "catalog"
)]
async fn list_pallet_types(State(state): State<ApiState>) -> Response {
    match state.service.call(|service| service.list_pallet_types()).await {
        Ok(types) => Json(types).into_response(),
        Err(err) => service_error(err),
    }
}

#[utoipa::path(
    post,
    path = "/pallet-types",
    request_body = NewPalletType,
    responses(
        (status = CREATED, description = "Pallet type created", body = PalletType),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid pallet type", body = ErrorResponse)
    ),
    tag = "catalog"
)]
async fn create_pallet_type(
    State(state): State<ApiState>,
    payload: Result<Json<NewPalletType>, JsonRejection>,
) -> Response {
    let new = match parse_json(payload) {
        Ok(new) => new,
        Err(response) => return response,
    };
    match state
        .service
        .call(move |service| service.create_pallet_type(new))
        .await
    {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(err) => service_error(err),
    }
}

#[utoipa::path(
    get,
    path = "/pallet-types/{id}",
    params(("id" = u64, Path, description = "Pallet type id")),
    responses(
        (status = 200, description = "Pallet type", body = PalletType),
        (status = NOT_FOUND, description = "Unknown pallet type", body = ErrorResponse)
    ),
    tag = "catalog"
)]
async fn get_pallet_type(State(state): State<ApiState>, Path(id): Path<u64>) -> Response {
    match state.service.call(move |service| service.pallet_type(id)).await {
        Ok(pallet_type) => Json(pallet_type).into_response(),
        Err(err) => service_error(err),
    }
}

#[utoipa::path(
    put,
    path = "/pallet-types/{id}",
    params(("id" = u64, Path, description = "Pallet type id")),
    request_body = PalletTypeUpdate,
    responses(
        (status = 200, description = "Updated pallet type", body = PalletType),
        (status = NOT_FOUND, description = "Unknown pallet type", body = ErrorResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid values", body = ErrorResponse)
    ),
    tag = "catalog"
)]
async fn update_pallet_type(
    State(state): State<ApiState>,
    Path(id): Path<u64>,
    payload: Result<Json<PalletTypeUpdate>, JsonRejection>,
) -> Response {
    let update = match parse_json(payload) {
        Ok(update) => update,
        Err(response) => return response,
    };
    match state
        .service
        .call(move |service| service.update_pallet_type(id, update))
        .await
    {
        Ok(updated) => Json(updated).into_response(),
        Err(err) => service_error(err),
    }
}

#[utoipa::path(
    delete,
    path = "/pallet-types/{id}",
    params(("id" = u64, Path, description = "Pallet type id")),
    responses(
        (status = NO_CONTENT, description = "Pallet type deleted"),
        (status = NOT_FOUND, description = "Unknown pallet type", body = ErrorResponse)
    ),
    tag = "catalog"
)]
async fn delete_pallet_type(State(state): State<ApiState>, Path(id): Path<u64>) -> Response {
    match state
        .service
        .call(move |service| service.delete_pallet_type(id))
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => service_error(err),
    }
}

#[utoipa::path(
    get,
    path = "/profile-depths",
    responses((status = 200, description = "Configured profile depths", body = [ProfileDepthEntry])),
    tag = "catalog"
)]
async fn list_profile_depths(State(state): State<ApiState>) -> Response {
    match state.service.call(|service| service.profile_depths()).await {
        Ok(depths) => {
            let entries: Vec<ProfileDepthEntry> = depths
                .into_iter()
                .map(|(profile_type, depth_mm)| ProfileDepthEntry {
                    profile_type,
                    depth_mm,
                })
                .collect();
            Json(entries).into_response()
        }
        Err(err) => service_error(err),
    }
}

#[utoipa::path(
    put,
    path = "/profile-depths/{profile_type}",
    params(("profile_type" = String, Path, description = "Profile system, e.g. AWS75")),
    request_body = ProfileDepthRequest,
    responses(
        (status = 200, description = "Saved profile depth", body = ProfileDepthEntry),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid depth", body = ErrorResponse)
    ),
    tag = "catalog"
)]
async fn put_profile_depth(
    State(state): State<ApiState>,
    Path(profile_type): Path<String>,
    payload: Result<Json<ProfileDepthRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let depth_mm = request.depth_mm;
    let saved = state
        .service
        .call(move |service| {
            service.upsert_profile_depth(&profile_type, depth_mm)?;
            Ok(profile_type.trim().to_string())
        })
        .await;
    match saved {
        Ok(profile_type) => Json(ProfileDepthEntry {
            profile_type,
            depth_mm,
        })
        .into_response(),
        Err(err) => service_error(err),
    }
}

#[utoipa::path(
    delete,
    path = "/profile-depths/{profile_type}",
    params(("profile_type" = String, Path, description = "Profile system, e.g. AWS75")),
    responses(
        (status = NO_CONTENT, description = "Profile depth deleted"),
        (status = NOT_FOUND, description = "Unknown profile type", body = ErrorResponse)
    ),
    tag = "catalog"
)]
async fn delete_profile_depth(
    State(state): State<ApiState>,
    Path(profile_type): Path<String>,
) -> Response {
    match state
        .service
        .call(move |service| service.delete_profile_depth(&profile_type))
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => service_error(err),
    }
}

async fn serve_openapi_json() -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
