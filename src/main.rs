extern crate actix_files;
extern crate actix_multipart;
extern crate actix_web;
extern crate anyhow;
extern crate bytes;
extern crate chrono;
extern crate default;
extern crate dotenv;
extern crate env_logger;
extern crate futures_util;
extern crate itertools;
extern crate jsonwebtoken;
extern crate log;
extern crate serde;
extern crate serde_json;
extern crate sqlx;
extern crate thiserror;
extern crate tokio;
extern crate uuid;

mod config;
mod context;
mod core;
mod database;
mod error;
mod handlers;
mod impls;
mod middlewares;
mod request;
mod response;

use actix_files::Files;
use actix_web::middleware::Logger;
use actix_web::web::{get, post, put, scope, Data, JsonConfig};
use actix_web::{guard, App, HttpServer};
use anyhow::Context;
use log::info;
use sqlx::postgres::PgPoolOptions;

use crate::config::Config;
use crate::core::codec::AttachmentPolicy;
use crate::database::sqlx::PgSqlxManager;
use crate::error::Error;
use crate::impls::uploaders::local_storage::LocalStorage;
use crate::middlewares::jwt::JWTMiddleware;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("actix_web=info,survey=info")).init();
    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;
    sqlx::migrate!().run(&pool).await.context("failed to run migrations")?;
    std::fs::create_dir_all(&config.upload_path).with_context(|| format!("failed to create upload directory {}", config.upload_path))?;

    let manager = PgSqlxManager::new(pool);
    let uploader = Data::new(LocalStorage::new(&config.upload_path, config.uploads_base()));
    let policy = Data::new(AttachmentPolicy {
        max_bytes: config.max_attachment_bytes,
    });
    let secret = config.jwt_secret.clone().into_bytes();
    let upload_path = config.upload_path.clone();

    info!("listening on {}", config.bind_addr);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(JsonConfig::default().error_handler(|err, _| Error::MalformedRequest(err.to_string()).into()))
            .app_data(Data::new(manager.clone()))
            .app_data(uploader.clone())
            .app_data(policy.clone())
            .service(Files::new("/uploads", &upload_path))
            .service(
                scope("/forms/{id}")
                    .wrap(JWTMiddleware::new(secret.clone()))
                    .route(
                        "/submissions",
                        post()
                            .guard(guard::fn_guard(handlers::submission::is_multipart))
                            .to(handlers::submission::submit_multipart::<LocalStorage>),
                    )
                    .route("/submissions", post().to(handlers::submission::submit_json::<LocalStorage>))
                    .route("/submissions", get().to(handlers::submission::list))
                    .route("/submissions/{submission_id}", get().to(handlers::submission::detail))
                    .route("/dashboard", get().to(handlers::report::dashboard))
                    .route("/settings", get().to(handlers::settings::get))
                    .route("/settings", put().to(handlers::settings::update)),
            )
    })
    .bind(&config.bind_addr)?
    .run()
    .await?;
    Ok(())
}
