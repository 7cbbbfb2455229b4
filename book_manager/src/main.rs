use std::sync::Arc;

use actix_web::HttpServer;
use opentelemetry::global;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::runtime::TokioCurrentThread;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

use book_manager::app_config::build_app;
use book_manager::books_gateway::{BooksGateway, SqliteBooksGateway, SqliteBooksGatewayConfig};
use book_manager::settings::{Settings, TelemetrySettings};

const APP_NAME: &str = "book_manager";

// Based on https://github.com/LukeMathWalker/tracing-actix-web/blob/main/examples/opentelemetry/src/main.rs#L15
fn init_telemetry(settings: &TelemetrySettings) {
    global::set_text_map_propagator(TraceContextPropagator::new());
    let telemetry = settings.jaeger_enabled.then(|| {
        #[allow(deprecated)]
        let tracer = opentelemetry_jaeger::new_agent_pipeline()
            .with_service_name(APP_NAME)
            .install_batch(TokioCurrentThread)
            .expect("Failed to install OpenTelemetry tracer.");
        tracing_opentelemetry::layer().with_tracer(tracer)
    });

    // Filter based on level - trace, debug, info, warn, error
    // Tunable via `RUST_LOG` env variable
    let env_filter = EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new("info"));
    let formatting_layer = BunyanFormattingLayer::new(APP_NAME.into(), std::io::stdout);
    let subscriber = Registry::default()
        .with(env_filter)
        .with(telemetry)
        .with(JsonStorageLayer)
        .with(formatting_layer);
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to install `tracing` subscriber.")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let settings = Settings::load().expect("Failed to load settings");
    init_telemetry(&settings.telemetry);

    let books_gateway: Arc<dyn BooksGateway> = match SqliteBooksGateway::init(
        SqliteBooksGatewayConfig {
            database_path: settings.database_path.clone(),
        },
    )
    .await
    {
        Ok(gateway) => Arc::new(gateway),
        Err(err) => {
            tracing::error!("Failed to connect to SQLite: {:#}", err);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Book Manager API listening on http://localhost:{}",
        settings.port
    );
    let app_gateway = books_gateway.clone();
    HttpServer::new(move || build_app(app_gateway.clone()))
        .bind((settings.host.as_str(), settings.port))?
        .run()
        .await?;

    books_gateway.close().await;
    global::shutdown_tracer_provider();
    Ok(())
}
