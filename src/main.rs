use actix_web::{middleware, web, App, HttpServer};
use notify_service::{handlers, metrics, websocket, Config, ConnectionRegistry, Dispatcher};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting notify service");

    let config = Config::from_env()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    // The registry lives for the whole process run and is injected into the
    // session handler and dispatcher; nothing in it survives a restart.
    let registry = ConnectionRegistry::new();
    let dispatcher = Dispatcher::new(registry.clone());
    tracing::info!("connection registry initialized");

    let addr = format!("0.0.0.0:{}", config.app.port);
    tracing::info!("Starting HTTP server on {}", addr);

    let config_data = web::Data::new(config);
    let registry_data = web::Data::new(registry);
    let dispatcher_data = web::Data::new(dispatcher);

    HttpServer::new(move || {
        App::new()
            .app_data(config_data.clone())
            .app_data(registry_data.clone())
            .app_data(dispatcher_data.clone())
            .wrap(middleware::Logger::default())
            .route("/health", web::get().to(|| async { "OK" }))
            .route("/metrics", web::get().to(metrics::serve_metrics))
            .configure(|cfg| {
                handlers::register_routes(cfg);
                websocket::register_routes(cfg);
            })
    })
    .bind(&addr)?
    .run()
    .await
}
