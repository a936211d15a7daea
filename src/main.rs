use actix_web::{web, App, HttpServer};
use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use teacher_predictor::api;
use teacher_predictor::config::Opts;
use teacher_predictor::database::Database;
use teacher_predictor::model::ModelCache;
use teacher_predictor::session::SessionStore;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("teacher_predictor=info")),
        )
        .init();

    let opts = Opts::parse();

    let db = Database::open(&opts.teachers_file, &opts.history_file).context("failed to open the record store")?;

    let cache = ModelCache::new(&opts.dataset, opts.training_params());
    tracing::info!(dataset = %cache.dataset().display(), "loading student performance data");
    let models = cache.get().context("failed to train models")?;
    let summary = models.summary();
    tracing::info!(
        rows = summary.rows,
        pass_rows = summary.pass_rows,
        accuracy = summary.classifier_accuracy,
        "models ready"
    );

    let db = web::Data::new(db);
    let sessions = web::Data::new(SessionStore::default());
    let cache = web::Data::new(cache);

    tracing::info!(bind = %opts.bind, "starting teacher result predictor");
    HttpServer::new(move || {
        App::new()
            .app_data(db.clone())
            .app_data(sessions.clone())
            .app_data(cache.clone())
            .configure(api::configure)
    })
    .bind(opts.bind.as_str())
    .with_context(|| format!("failed to bind {}", opts.bind))?
    .run()
    .await?;

    Ok(())
}
