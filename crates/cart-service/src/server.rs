//! HTTP server for the CosmicCart order API.
//!
//! All endpoints are nested under `/api`.

use crate::apis::order;
use axum::{
	http::HeaderValue,
	routing::{delete, get, post, put},
	Router,
};
use cart_config::{ApiConfig, Config};
use cart_core::OrderStateMachine;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
	cors::{AllowOrigin, CorsLayer},
	timeout::TimeoutLayer,
	trace::TraceLayer,
};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Order service that owns every order and validates status changes.
	pub orders: Arc<OrderStateMachine>,
	/// Complete configuration.
	pub config: Arc<Config>,
}

/// Builds the API router with its middleware.
pub fn router(state: AppState, api_config: Option<&ApiConfig>) -> Router {
	let api = Router::new()
		.route("/health", get(order::health))
		.route("/order-flow", get(order::order_flow))
		.route("/orders", post(order::create_order))
		.route("/orders/status", put(order::update_order_status))
		.route("/orders/{id}", get(order::get_order))
		.route("/orders/{id}/next-statuses", get(order::next_statuses))
		.route(
			"/restaurants/{restaurant_id}/orders",
			get(order::list_restaurant_orders),
		)
		.route(
			"/restaurants/{restaurant_id}/orders/{id}",
			delete(order::delete_order),
		)
		.route("/users/{user_id}/orders", get(order::list_user_orders));

	let timeout = Duration::from_secs(api_config.map_or(30, |api| api.timeout_seconds));

	Router::new()
		.nest("/api", api)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(TimeoutLayer::new(timeout))
				.layer(cors_layer(api_config)),
		)
		.with_state(state)
}

fn cors_layer(api_config: Option<&ApiConfig>) -> CorsLayer {
	let Some(cors) = api_config.and_then(|api| api.cors.as_ref()) else {
		return CorsLayer::permissive();
	};

	let origins: Vec<HeaderValue> = cors
		.allowed_origins
		.iter()
		.filter_map(|origin| match origin.parse() {
			Ok(value) => Some(value),
			Err(_) => {
				tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
				None
			},
		})
		.collect();

	CorsLayer::permissive().allow_origin(AllowOrigin::list(origins))
}

/// Starts the HTTP server for the API.
pub async fn start_server(
	api_config: ApiConfig,
	orders: Arc<OrderStateMachine>,
	config: Config,
) -> Result<(), Box<dyn std::error::Error>> {
	let bind_address = config
		.api_bind_address()
		.unwrap_or_else(|| format!("{}:{}", api_config.host, api_config.port));
	let state = AppState {
		orders,
		config: Arc::new(config),
	};
	let app = router(state, Some(&api_config));

	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("CosmicCart order API starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}
