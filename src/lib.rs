use std::sync::Arc;

use actix_web::web::{self, Data, PathConfig, ServiceConfig};
use actix_web::{App, HttpResponse, HttpServer, ResponseError};
use mongodb::Client;
use tracing::info;
use tracing_actix_web::TracingLogger;

pub mod auth;
pub mod campaign;
pub mod config;
pub mod database;
pub mod decode;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod query;
pub mod results;
pub mod typedid;
mod utils;

pub use campaign::{CampaignBody, CreateCampaignBody, StatusUpdateBody};
pub use config::Config;
pub use error::Error;
pub use results::ResultBody;

use crate::database::{Database, MongoDatabase};
use crate::decode::StrictJsonConfig;
use crate::dispatch::http::HttpScheduler;
use crate::dispatch::Dispatcher;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(health::healthz)
        .service(campaign::create_campaign)
        .service(campaign::get_campaigns)
        .service(campaign::get_campaign_by_id)
        .service(campaign::describe_campaign)
        .service(campaign::update_campaign_status)
        .service(results::get_results);
}

async fn not_found() -> HttpResponse {
    Error::PathNotFound.error_response()
}

pub async fn run(config: Config) -> Result<(), Error> {
    info!("connecting to db: {}", config.database_name);
    let client = Client::with_uri_str(&config.database_uri).await?;
    let db = MongoDatabase::initialize(client.database(&config.database_name)).await?;
    let db: Arc<dyn Database> = Arc::new(db);

    let authenticator = auth::from_config(&config);
    let scheduler = HttpScheduler::new(config.dispatch_url.clone(), authenticator)?;
    let dispatcher = Dispatcher::start(Arc::clone(&db), Arc::new(scheduler), &config.dispatch());

    let json_config = StrictJsonConfig::default().limit(config.max_body_bytes);
    let query_settings = config.query();

    info!("listening on {}", config.bind);
    HttpServer::new(move || {
        App::new()
            .app_data(json_config.clone())
            .app_data(PathConfig::default().error_handler(|err, _req| {
                // format path errors with custom format
                Error::InvalidPath(err).into()
            }))
            .app_data(Data::from(Arc::clone(&db)))
            .app_data(Data::new(dispatcher.clone()))
            .app_data(Data::new(query_settings.clone()))
            .wrap(TracingLogger::default())
            .configure(configure)
            .default_service(web::to(not_found))
    })
    .bind(config.bind.as_str())?
    .run()
    .await?;

    Ok(())
}
