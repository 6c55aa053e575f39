use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use std::time::Duration;

use presensi::config::Config;
use presensi::db::init_db;
use presensi::docs::ApiDoc;
use presensi::routes::{self, RateLimiters};
use presensi::utils::{assignment_cache::AssignmentCache, file_store::FileStore};
use tracing::{error, info};
use tracing_appender::rolling;
use utoipa::OpenApi; // needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(addr = %config.server_addr, "Server starting...");

    let pool = init_db(&config).await?;
    let clock = config.civil_clock()?;
    let store = FileStore::new(&config.upload_dir, config.max_upload_bytes);
    let cache = AssignmentCache::new(Duration::from_secs(config.assignment_cache_ttl_secs));
    let limiters = RateLimiters::from_config(&config)?;

    let pool_for_warmup = pool.clone();
    let cache_for_warmup = cache.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = cache_for_warmup.warmup(&pool_for_warmup, 250).await {
            error!(error = ?e, "Failed to warm up assignment cache");
        }
    });

    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                // wildcard {_:.*} so the JS/CSS assets match
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(Data::new(clock))
            .app_data(Data::new(store.clone()))
            .app_data(Data::new(cache.clone()))
            .configure(|cfg| routes::configure(cfg, &config, limiters.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    info!("Server stopped");
    Ok(())
}
