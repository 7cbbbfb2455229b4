use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, Error};
use paperclip::actix::{web, OpenApiExt};
use tracing_actix_web::TracingLogger;

use crate::api_error::ApiError;
use crate::books_gateway::BooksGateway;
use crate::handlers;
use crate::validation::ValidationError;

/// Known paths answer unsupported methods with the same 404 as unknown paths
pub fn config_app(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(handlers::health)))
        .service(
            web::resource("/books")
                .route(web::get().to(handlers::list_books))
                .route(web::post().to(handlers::create_book))
                .default_service(actix_web::web::to(handlers::not_found)),
        )
        .service(
            web::resource("/books/{book_id}")
                .route(web::get().to(handlers::get_book))
                .route(web::patch().to(handlers::update_book))
                .route(web::put().to(handlers::update_book))
                .route(web::delete().to(handlers::delete_book))
                .default_service(actix_web::web::to(handlers::not_found)),
        );
}

/// Assembles the whole application: routes, request logging, extractor error
/// handling, the OpenAPI document and the 404 fallback
pub fn build_app(
    books_gateway: Arc<dyn BooksGateway>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    let json_config = actix_web::web::JsonConfig::default().error_handler(|err, _req| {
        tracing::warn!("Rejected request body {}", err);
        ApiError::from(ValidationError::InvalidBody).into()
    });
    let query_config = actix_web::web::QueryConfig::default().error_handler(|err, _req| {
        tracing::warn!("Rejected query string {}", err);
        ApiError::from(ValidationError::InvalidQuery).into()
    });

    App::new()
        .wrap_api()
        .app_data(web::Data::new(books_gateway))
        .app_data(json_config)
        .app_data(query_config)
        .wrap(TracingLogger::default())
        .configure(config_app)
        .with_json_spec_at("/apispec/v2")
        .build()
        .default_service(actix_web::web::to(handlers::not_found))
}
