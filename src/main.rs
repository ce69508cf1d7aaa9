mod classifier;
mod config;
mod error;
mod handlers;
mod inference;
mod models;
mod preprocess;
mod store;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use log::info;

use crate::config::Config;
use crate::inference::Model;
use crate::store::HistoryStore;

fn fatal(err: impl std::error::Error + Send + Sync + 'static) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, err)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().map_err(fatal)?;

    // The model must be ready before the listener binds; a load failure
    // means the process never serves.
    let model = Model::load(&config.model_source).await.map_err(fatal)?;
    info!("Model loaded from {}", config.model_source);

    let store = HistoryStore::open(&config.database_path).map_err(fatal)?;

    let model = web::Data::new(model);
    let store = web::Data::new(store);

    info!("Server running at http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(model.clone())
            .app_data(store.clone())
            .service(web::resource("/predict").route(web::post().to(handlers::predict)))
            .service(
                web::resource("/predict/histories").route(web::get().to(handlers::histories)),
            )
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
