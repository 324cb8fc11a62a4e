// Pitwall API v0.1
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod cache;
mod config;
mod errors;
mod helpers;
mod models;
mod routes;
mod services;

use cache::ResultCache;
use config::AppConfig;
use routes::races::RacesState;
use routes::results::AppState;
use routes::weather::WeatherState;
use services::countdown::{CountdownState, SharedCountdownState};
use services::jolpica::JolpicaClient;
use services::openmeteo::OpenMeteoClient;
use services::results::ResultsService;

/// Pitwall API — OpenAPI specification.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pitwall API",
        version = "0.1.0",
        description = "Motorsport session-result aggregation API. Fetches race, \
            qualifying, and sprint results from a Jolpica (Ergast-compatible) \
            upstream with retry/backoff and an idempotent in-memory cache, aligns \
            session times to hourly Open-Meteo forecasts, and tracks a countdown \
            to the next main event of a race weekend.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Schedule", description = "Season schedules and the next upcoming race"),
        (name = "Results", description = "Session-result loading, reads, and retries"),
        (name = "Weather", description = "Per-session weather alignment"),
        (name = "Countdown", description = "Background countdown ticker status"),
    ),
    paths(
        routes::health::health_check,
        routes::races::list_season_races,
        routes::races::next_race,
        routes::results::load_season_results,
        routes::results::get_race_results,
        routes::results::retry_race_results,
        routes::weather::get_race_weather,
        routes::countdown::get_countdown,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::results::LoadSummary,
            routes::results::RaceResultsResponse,
            routes::results::RetryResponse,
            routes::weather::SessionWeatherEntry,
            routes::weather::RaceWeatherResponse,
            models::Race,
            models::Circuit,
            models::Location,
            models::SessionTime,
            models::SessionKind,
            models::RaceKey,
            models::FetchState,
            models::SessionResult,
            models::FastestLap,
            models::SessionResults,
            models::WeatherSample,
            services::countdown::CountdownState,
            services::countdown::NextEvent,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pitwall_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();
    let timeout = Duration::from_secs(config.request_timeout_secs);

    // Upstream clients
    let jolpica = JolpicaClient::new(&config.jolpica_base_url, timeout);
    let open_meteo = OpenMeteoClient::new(&config.open_meteo_base_url, timeout);

    // Result cache + orchestration service
    let cache = ResultCache::new();
    let results_service = ResultsService::new(jolpica.clone(), cache.clone());

    // Create shared countdown state and spawn the one-second ticker
    let countdown_state: SharedCountdownState = Arc::new(RwLock::new(CountdownState::new()));
    tokio::spawn(services::countdown::run_countdown(countdown_state.clone()));

    // CORS — read-mostly API; POST only for load/retry dispatch
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers(Any);

    // Build router
    // Schedule routes carry the countdown handle so /next retargets the ticker.
    let race_routes = Router::new()
        .route(
            "/api/v1/seasons/:season/races",
            get(routes::races::list_season_races),
        )
        .route("/api/v1/seasons/:season/next", get(routes::races::next_race))
        .with_state(RacesState {
            jolpica: jolpica.clone(),
            countdown: countdown_state.clone(),
        });

    let result_routes = Router::new()
        .route(
            "/api/v1/seasons/:season/results/load",
            post(routes::results::load_season_results),
        )
        .route(
            "/api/v1/results/:season/:round",
            get(routes::results::get_race_results),
        )
        .route(
            "/api/v1/results/:season/:round/retry",
            post(routes::results::retry_race_results),
        )
        .with_state(AppState {
            jolpica: jolpica.clone(),
            results: results_service,
        });

    let weather_routes = Router::new()
        .route(
            "/api/v1/weather/:season/:round",
            get(routes::weather::get_race_weather),
        )
        .with_state(WeatherState { jolpica, open_meteo });

    // Health check reads cache stats only
    let health_routes = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .with_state(cache);

    let countdown_routes = Router::new()
        .route("/api/v1/countdown", get(routes::countdown::get_countdown))
        .with_state(countdown_state);

    let app = Router::new()
        .merge(health_routes)
        .merge(race_routes)
        .merge(result_routes)
        .merge(weather_routes)
        .merge(countdown_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
