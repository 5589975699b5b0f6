use axum::{http::Method, routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod auth;
mod config;
mod database;
mod error;
mod handlers;
mod registry;
mod seed;
mod services;
mod store;
mod validation;
mod websocket;

pub use error::{ApiError, ApiResult, AppError};

use auth::IdentityService;
use config::Config;
use registry::Registry;
use services::{audit::AuditService, encryption::EncryptionService, ChatService, Notifier, TicketService};
use store::{DataStore, MemoryStore, PgStore};
use websocket::WsManager;


pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn DataStore>,
    pub identity: IdentityService,
    pub tickets: TicketService,
    pub registry: Arc<Registry>,
    pub chat: ChatService,
    pub notifier: Notifier,
    pub audit: AuditService,
    pub ws_manager: Arc<WsManager>,
}

impl AppState {
    /// Wire the services around a ready store and load the ticket cache.
    pub async fn new(config: Config, store: Arc<dyn DataStore>) -> anyhow::Result<Arc<Self>> {
        let encryption = EncryptionService::new(&config.encryption_key)?;
        let registry = Arc::new(Registry::new(encryption));
        if config.seed_demo_data {
            seed::populate_registry(&registry).await?;
        }

        let ws_manager = Arc::new(WsManager::new());
        let notifier = Notifier::new(ws_manager.clone(), config.notify_delay);
        let identity = IdentityService::new(store.clone(), config.jwt_secret.clone(), ws_manager.clone())
            .with_session_ttl(config.session_ttl);
        let tickets = TicketService::new(store.clone(), registry.clone(), notifier.clone());
        tickets.refresh().await?;

        tokio::spawn(services::notifier::forward_session_events(
            identity.subscribe(),
            notifier.clone(),
        ));

        Ok(Arc::new(AppState {
            chat: ChatService::new(notifier.clone()),
            audit: AuditService::new(),
            config,
            store,
            identity,
            tickets,
            registry,
            notifier,
            ws_manager,
        }))
    }
}

pub fn app_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/", get(|| async { "Helpdesk API v1.0.0" }))
        .route("/health", get(handlers::health_check))
        .route("/api/v1/dashboard", get(handlers::dashboard_stats))
        .route("/api/v1/audit", get(handlers::audit_log))
        .nest("/api/v1/auth", auth::auth_routes())
        .nest("/api/v1/tickets", handlers::ticket_routes())
        .nest("/api/v1/reports", handlers::report_routes())
        .nest("/api/v1/units", handlers::unit_routes())
        .nest("/api/v1/sectors", handlers::sector_routes())
        .nest("/api/v1/assets", handlers::asset_routes())
        .nest("/api/v1/remote-access", handlers::remote_access_routes())
        .nest("/api/v1/users", handlers::user_routes())
        .nest("/api/v1/problems", handlers::problem_routes())
        .nest("/api/v1/chat", handlers::chat_routes())
        .route("/ws", get(websocket::websocket_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn DataStore>> {
    let demo_hash = if config.seed_demo_data {
        Some(auth::identity::hash_password(seed::DEMO_PASSWORD)?)
    } else {
        None
    };

    match &config.database_url {
        Some(url) => {
            let pool = database::create_pool(url).await?;
            database::migrate(&pool).await?;
            let store = PgStore::new(pool);
            if let Some(hash) = &demo_hash {
                seed::seed_pg_store(&store, hash).await?;
            }
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store; data is lost on restart");
            let store = MemoryStore::new();
            if let Some(hash) = &demo_hash {
                seed::seed_memory_store(&store, hash).await;
            }
            Ok(Arc::new(store))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let store = open_store(&config).await?;
    let app_state = AppState::new(config.clone(), store).await?;
    let app = app_router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.server_addr).await?;
    tracing::info!("Server running on {}", config.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
