use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing_subscriber::{fmt, EnvFilter};

use equalize::archive::MongoArchive;
use equalize::assistant::{Assistant, HttpAssistant};
use equalize::auth::LocalIdentityProvider;
use equalize::config::Config;
use equalize::routes;
use equalize::state::AppState;

const DEFAULT_LOG_FILTER: &str = "equalize=info,actix_web=info";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    fmt().with_env_filter(filter).init();
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_tracing();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(%err, "invalid configuration");
            std::process::exit(1);
        }
    };

    let archive = match &config.mongodb_uri {
        Some(uri) => match MongoArchive::connect(uri, &config.mongodb_database).await {
            Ok(archive) => {
                tracing::info!(database = %config.mongodb_database, "archiving ledgers to MongoDB");
                Some(archive)
            }
            Err(err) => {
                tracing::error!(%err, "couldn't connect to MongoDB");
                std::process::exit(1);
            }
        },
        None => {
            tracing::info!("MONGODB_URI is not set, ledgers live in memory only");
            None
        }
    };
    if config.assistant.url.is_none() {
        tracing::warn!("ASSISTANT_URL is not set, assistant routes will answer 503");
    }

    let identity = Arc::new(LocalIdentityProvider::new(
        &config.session_secret,
        config.telegram_bot_token.clone(),
    ));
    let state = web::Data::new(AppState::new(identity, archive, config.seed_sample_data));

    tracing::info!(address = %config.bind_address, "listening");
    let assistant_config = config.assistant.clone();
    let cors_origin = config.cors_origin.clone();
    HttpServer::new(move || {
        let assistant: Arc<dyn Assistant> = Arc::new(HttpAssistant::new(assistant_config.clone()));
        let cors = match &cors_origin {
            Some(origin) => Cors::default()
                .allowed_origin(origin)
                .allow_any_method()
                .allow_any_header(),
            None => Cors::permissive(),
        };
        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(state.clone())
            .app_data(web::Data::from(assistant))
            .configure(routes::configure)
    })
    .bind(config.bind_address.as_str())?
    .run()
    .await
}
