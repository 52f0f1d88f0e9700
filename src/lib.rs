use actix_web::web::{self, Data, FormConfig, JsonConfig, PathConfig, QueryConfig, ServiceConfig};
use actix_web::{App, HttpResponse, HttpServer, ResponseError};
use mongodb::Client;
use tracing::info;
use tracing_actix_web::TracingLogger;

pub mod campaign;
pub mod class;
pub mod config;
pub mod database;
pub mod error;
pub mod seed;
pub mod survey;
pub mod typedid;
pub mod urn;
pub mod user;
pub mod utils;

pub use campaign::{CampaignBody, UpdateCampaignForm};
pub use config::Config;
pub use error::Error;
pub use utils::SuccessBody;

use crate::database::{Database, MongoDatabase};

/// Registers the extractor settings and every endpoint.
pub fn configure(cfg: &mut ServiceConfig) {
    cfg.app_data(JsonConfig::default().error_handler(|err, _req| {
        // format json errors with custom format
        Error::InvalidJson(err).into()
    }))
    .app_data(PathConfig::default().error_handler(|err, _req| {
        // format path errors with custom format
        Error::InvalidPath(err).into()
    }))
    .app_data(FormConfig::default().error_handler(|err, _req| {
        // format form errors with custom format
        Error::InvalidForm(err).into()
    }))
    .app_data(QueryConfig::default().error_handler(|err, _req| {
        // format query errors with custom format
        Error::InvalidQuery(err).into()
    }))
    .service(campaign::endpoints::update_campaign)
    .service(campaign::endpoints::get_campaigns)
    // before the by-urn route, which would otherwise match
    .service(campaign::endpoints::search_campaigns)
    .service(campaign::endpoints::get_campaign_by_urn)
    .service(user::endpoints::get_user_info);
}

pub async fn path_not_found() -> HttpResponse {
    Error::PathNotFound.error_response()
}

pub fn run(config: Config) -> Result<(), Error> {
    actix_web::rt::System::new().block_on(serve(config))
}

pub async fn serve(config: Config) -> Result<(), Error> {
    info!("connecting to db: {}", config.mongodb_uri);
    let client = Client::with_uri_str(&config.mongodb_uri).await?;
    let db = MongoDatabase::new(client, &config.database);

    if config.seed {
        seed::seed(&db).await?;
    }
    db.create_indexes().await?;

    let db = Data::new(Box::new(db) as Box<dyn Database>);

    info!("listening on {}", config.bind_address);
    HttpServer::new(move || {
        App::new()
            .app_data(db.clone())
            .wrap(TracingLogger::default())
            .configure(configure)
            .default_service(web::to(path_not_found))
    })
    .bind(config.bind_address)?
    .run()
    .await?;

    Ok(())
}
