use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use dotenvy::dotenv;

mod api;
mod audit;
mod auth;
mod compliance;
mod config;
mod db;
mod docs;
mod errors;
mod ledger;
mod model;
mod notify;
mod routes;
mod utils;
mod workflow;
mod workhours;

use config::Config;
use db::init_db;

use crate::utils::fingerprint_filter;
use crate::utils::punch_cache;
use tracing::info;
use tracing_appender::rolling;
use utoipa_swagger_ui::SwaggerUi;
use crate::docs::ApiDoc;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()

#[get("/")]
async fn index() -> impl Responder {
    "Time clock is up"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let config = Config::from_env();

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await;

    let pool_for_filter_warmup = pool.clone();
    let pool_for_cache_warmup = pool.clone();
    // Clone values for the closure (avoid move issues)
    let server_addr = config.server_addr.clone();
    let config_data = config.clone();
    let filter_batch = config.warmup_filter_batch;
    let cache_days = config.warmup_cache_days;
    let cache_batch = config.warmup_cache_batch;

    actix_web::rt::spawn(async move {
        if let Err(e) =
            fingerprint_filter::warmup_fingerprint_filter(&pool_for_filter_warmup, filter_batch)
                .await
        {
            eprintln!("Failed to warmup fingerprint filter: {:?}", e);
        }
    });

    actix_web::rt::spawn(async move {
        // Warm up each employee's latest punch from recent days in batches
        if let Err(e) =
            punch_cache::warmup_punch_cache(&pool_for_cache_warmup, cache_days, cache_batch).await
        {
            eprintln!("Failed to warmup punch cache: {:?}", e);
        }
    });

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .service(index)
            // Configure rate-limited core routes
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await
}
