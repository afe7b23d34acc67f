//! HTTP server for the VibeMarket API.
//!
//! Serves the purchase flow, card lookups and client bootstrap values under
//! `/api`.

use axum::{
	extract::{rejection::JsonRejection, Path, Query, State},
	http::{HeaderValue, StatusCode},
	response::{IntoResponse, Json},
	routing::{get, post},
	Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
	cors::{AllowOrigin, CorsLayer},
	timeout::TimeoutLayer,
	trace::TraceLayer,
};
use vibe_config::{ApiConfig, CorsConfig};
use vibe_core::MarketEngine;
use vibe_types::{
	APIError, BuyTokenRequest, CardAttributesResponse, ColorResponse, ConfigResponse,
	PurchaseAttempt,
};

use crate::apis::{self, cards::CardQuery};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub engine: Arc<MarketEngine>,
}

/// Starts the HTTP server and serves until the listener fails.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<MarketEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(&api_config, AppState { engine })?;

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("VibeMarket API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

fn router(api_config: &ApiConfig, state: AppState) -> Result<Router, Box<dyn std::error::Error>> {
	let app = Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/config", get(handle_get_config))
				.route("/purchases", post(handle_submit_purchase))
				.route(
					"/purchases/{id}",
					get(handle_get_purchase).delete(handle_dismiss_purchase),
				)
				.route("/cards/{seed}", get(handle_get_card))
				.route("/colors/{address}", get(handle_get_color)),
		)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(TimeoutLayer::new(Duration::from_secs(
					api_config.timeout_seconds,
				)))
				.layer(cors_layer(api_config.cors.as_ref())?),
		)
		.with_state(state);

	Ok(app)
}

/// Permissive unless origins are configured.
fn cors_layer(cors: Option<&CorsConfig>) -> Result<CorsLayer, Box<dyn std::error::Error>> {
	let Some(cors) = cors else {
		return Ok(CorsLayer::permissive());
	};

	let origins = cors
		.allowed_origins
		.iter()
		.map(|origin| HeaderValue::from_str(origin))
		.collect::<Result<Vec<_>, _>>()?;

	Ok(CorsLayer::permissive().allow_origin(AllowOrigin::list(origins)))
}

/// Handles GET /api/config requests.
async fn handle_get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
	Json(apis::config::get_config(state.engine.config()))
}

/// Handles POST /api/purchases requests.
///
/// Answers `202 Accepted` with the attempt id once the purchase is running;
/// progress is read back through GET /api/purchases/{id}. A body that is not
/// a well-formed request is answered like any other invalid parameter.
async fn handle_submit_purchase(
	State(state): State<AppState>,
	payload: Result<Json<BuyTokenRequest>, JsonRejection>,
) -> Result<impl IntoResponse, APIError> {
	let Json(request) = payload.map_err(|rejection| {
		tracing::warn!("Malformed purchase request: {}", rejection.body_text());
		APIError::BadRequest {
			error_type: "INVALID_PARAMS".to_string(),
			message: rejection.body_text(),
		}
	})?;

	match apis::purchase::submit_purchase(request, &state.engine).await {
		Ok(accepted) => Ok((StatusCode::ACCEPTED, Json(accepted))),
		Err(e) => {
			tracing::warn!("Purchase request rejected: {}", e);
			Err(e)
		},
	}
}

/// Handles GET /api/purchases/{id} requests.
async fn handle_get_purchase(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<PurchaseAttempt>, APIError> {
	apis::purchase::get_purchase(&id, &state.engine)
		.await
		.map(Json)
}

/// Handles DELETE /api/purchases/{id} requests.
async fn handle_dismiss_purchase(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<PurchaseAttempt>, APIError> {
	apis::purchase::dismiss_purchase(&id, &state.engine)
		.await
		.map(Json)
}

/// Handles GET /api/cards/{seed} requests.
async fn handle_get_card(
	Path(seed): Path<String>,
	Query(query): Query<CardQuery>,
	State(state): State<AppState>,
) -> Result<Json<CardAttributesResponse>, APIError> {
	match apis::cards::get_card(&seed, query, &state.engine).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Card lookup failed: {}", e);
			Err(e)
		},
	}
}

/// Handles GET /api/colors/{address} requests.
async fn handle_get_color(Path(address): Path<String>) -> Json<ColorResponse> {
	Json(apis::colors::get_color(address))
}
