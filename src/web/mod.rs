use axum::{
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::auth::{AuthProvider, SessionVerifier, SupabaseAuth, UserDirectory};
use crate::cache::ListingCache;
use crate::database::Database;
use crate::plugins::{build_notifier, FirecrawlScraper, Notifier, ProductScraper};
use crate::price_check::PriceChecker;
use crate::product_manager::ProductManager;
use crate::AppConfig;

pub mod handlers;
pub mod middleware;
pub mod responses;
pub mod session;

pub use handlers::{
    add_product, auth_callback, check_prices, check_prices_status, delete_product, error_page,
    health_check, list_products, product_history, sign_out,
};
pub use responses::*;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub product_manager: Arc<ProductManager>,
    pub price_checker: Arc<PriceChecker>,
    pub auth: Arc<dyn AuthProvider>,
    pub sessions: Arc<SessionVerifier>,
}

/// External collaborators the service talks to.
pub struct Collaborators {
    pub scraper: Arc<dyn ProductScraper>,
    pub auth: Arc<dyn AuthProvider>,
    pub users: Arc<dyn UserDirectory>,
    pub notifier: Arc<dyn Notifier>,
}

impl Collaborators {
    pub fn from_config(config: &AppConfig) -> crate::Result<Self> {
        let scraper = Arc::new(FirecrawlScraper::new(&config.scraper)?);
        let supabase = Arc::new(SupabaseAuth::new(&config.auth, config.server.request_timeout)?);

        Ok(Self {
            scraper,
            auth: supabase.clone(),
            users: supabase,
            notifier: build_notifier(&config.notifications)?,
        })
    }
}

impl AppState {
    pub fn new(config: AppConfig, db: Database, collaborators: Collaborators) -> Self {
        let listings = ListingCache::new();
        let sessions = SessionVerifier::new(&config.auth.jwt_secret, &config.auth.jwt_audience);

        let product_manager = ProductManager::new(
            db.clone(),
            Arc::clone(&collaborators.scraper),
            listings.clone(),
        );
        let price_checker = PriceChecker::new(
            db,
            collaborators.scraper,
            collaborators.users,
            collaborators.notifier,
            listings,
        );

        Self {
            config: Arc::new(config),
            product_manager: Arc::new(product_manager),
            price_checker: Arc::new(price_checker),
            auth: collaborators.auth,
            sessions: Arc::new(sessions),
        }
    }

    /// Opens the database and wires up the real HTTP collaborators.
    pub async fn from_config(config: AppConfig) -> crate::Result<Self> {
        let db = Database::open(&config.database).await?;
        let collaborators = Collaborators::from_config(&config)?;
        Ok(Self::new(config, db, collaborators))
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))

        // API routes
        .nest("/api", api_routes())

        // Auth routes
        .route("/auth/callback", get(auth_callback))
        .route("/auth/signout", post(sign_out))
        .route("/error", get(error_page))

        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::DEBUG)))
                .layer(CorsLayer::permissive())
                .layer(axum::middleware::from_fn(middleware::request_logging))
        )
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Product management
        .route("/products", get(list_products).post(add_product))
        .route("/products/:id", delete(delete_product))
        .route("/products/:id/history", get(product_history))

        // Batch price check, normally hit by an external scheduler
        .route("/cron/check-prices", post(check_prices).get(check_prices_status))
}

pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", state.config.server.host, state.config.server.port).parse()?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down...");
}
