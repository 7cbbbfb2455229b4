use std::sync::Arc;

use actix_web::http::header::LOCATION;
use actix_web::web::Data;
use actix_web::Error;
use actix_web::HttpResponse;
use paperclip::actix::{
    api_v2_operation,
    web::{self},
};

use crate::api::{BookFilter, BookId, BookPayload, ErrorResponse};
use crate::api_error::ApiError;
use crate::books_gateway::BooksGateway;
use crate::query;
use crate::validation::{self, parse_leading_int, ValidationError};

type Gateway = Data<Arc<dyn BooksGateway>>;

fn parse_book_id(raw: &str) -> Result<BookId, ApiError> {
    parse_leading_int(raw).ok_or(ApiError::Validation(ValidationError::InvalidId))
}

#[api_v2_operation]
pub async fn health() -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().finish())
}

#[api_v2_operation]
pub async fn create_book(
    books_gateway: Gateway,
    payload: web::Json<BookPayload>,
) -> Result<HttpResponse, Error> {
    let payload = payload.into_inner();
    tracing::info!(body = ?payload, "Create book");

    let new_book = validation::validate(&payload, true)
        .and_then(|fields| fields.into_new_book())
        .map_err(ApiError::from)?;

    let outcome = books_gateway
        .execute(&query::insert_book(&new_book))
        .await
        .map_err(ApiError::from)?;
    let book = books_gateway
        .fetch_one(&query::select_book(outcome.generated_id))
        .await
        .map_err(ApiError::from)?
        .ok_or(ApiError::NotFound)?;

    Ok(HttpResponse::Created()
        .append_header((LOCATION, format!("/books/{}", book.id)))
        .json(book))
}

#[api_v2_operation]
pub async fn list_books(
    books_gateway: Gateway,
    filter: web::Query<BookFilter>,
) -> Result<HttpResponse, Error> {
    let statement = query::list_books(&filter).map_err(ApiError::from)?;
    let books = books_gateway
        .fetch_many(&statement)
        .await
        .map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(books))
}

#[api_v2_operation]
pub async fn get_book(
    books_gateway: Gateway,
    book_id: web::Path<String>,
) -> Result<HttpResponse, Error> {
    let book_id = parse_book_id(&book_id)?;
    let book = books_gateway
        .fetch_one(&query::select_book(book_id))
        .await
        .map_err(ApiError::from)?
        .ok_or(ApiError::NotFound)?;
    Ok(HttpResponse::Ok().json(book))
}

#[api_v2_operation]
pub async fn update_book(
    books_gateway: Gateway,
    book_id: web::Path<String>,
    payload: web::Json<BookPayload>,
) -> Result<HttpResponse, Error> {
    let book_id = parse_book_id(&book_id)?;
    let payload = payload.into_inner();
    tracing::info!(book_id, body = ?payload, "Update book");

    if payload.is_empty() {
        return Err(ApiError::from(ValidationError::EmptyBody).into());
    }
    let fields = validation::validate(&payload, false).map_err(ApiError::from)?;
    let statement = query::update_book(book_id, &fields).map_err(ApiError::from)?;

    let outcome = books_gateway
        .execute(&statement)
        .await
        .map_err(ApiError::from)?;
    if outcome.rows_affected == 0 {
        return Err(ApiError::NotFound.into());
    }

    let book = books_gateway
        .fetch_one(&query::select_book(book_id))
        .await
        .map_err(ApiError::from)?
        .ok_or(ApiError::NotFound)?;
    Ok(HttpResponse::Ok().json(book))
}

#[api_v2_operation]
pub async fn delete_book(
    books_gateway: Gateway,
    book_id: web::Path<String>,
) -> Result<HttpResponse, Error> {
    let book_id = parse_book_id(&book_id)?;
    let outcome = books_gateway
        .execute(&query::delete_book(book_id))
        .await
        .map_err(ApiError::from)?;
    if outcome.rows_affected == 0 {
        return Err(ApiError::NotFound.into());
    }
    Ok(HttpResponse::NoContent().finish())
}

/// Terminal responder for requests no route matched
pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse {
        error: "Not Found".to_string(),
    })
}

#[cfg(test)]
mod handler_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use actix_web::http::header::LOCATION;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::json;

    use crate::api::{Book, ErrorResponse};
    use crate::app_config::build_app;
    use crate::books_gateway::{BooksGateway, SqliteBooksGateway, SqliteBooksGatewayConfig};

    async fn in_memory_gateway() -> Arc<dyn BooksGateway> {
        Arc::new(
            SqliteBooksGateway::init(SqliteBooksGatewayConfig {
                database_path: ":memory:".to_string(),
            })
            .await
            .expect("Failed to open in-memory database"),
        )
    }

    macro_rules! create_book {
        ($app:expr, $body:expr) => {{
            let request = test::TestRequest::post()
                .uri("/books")
                .set_json($body)
                .to_request();
            let response = test::call_service(&$app, request).await;
            assert_eq!(response.status(), StatusCode::CREATED);
            let book: Book = test::read_body_json(response).await;
            book
        }};
    }

    macro_rules! expect_error {
        ($app:expr, $request:expr, $status:expr, $message:expr) => {{
            let response = test::call_service(&$app, $request.to_request()).await;
            assert_eq!(response.status(), $status);
            let body: ErrorResponse = test::read_body_json(response).await;
            assert_eq!(body.error, $message);
        }};
    }

    #[actix_web::test]
    /// Tests if a created book can be read back with trimmed fields
    async fn test_create_and_get_book() {
        let app = test::init_service(build_app(in_memory_gateway().await)).await;

        let request = test::TestRequest::post()
            .uri("/books")
            .set_json(json!({"title": "  Dune ", "author": " Frank Herbert", "year": 1965}))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let location = response
            .headers()
            .get(LOCATION)
            .expect("No location header")
            .to_str()
            .expect("Invalid location header")
            .to_string();
        let created: Book = test::read_body_json(response).await;
        assert_eq!(location, format!("/books/{}", created.id));
        assert_eq!(created.title, "Dune");
        assert_eq!(created.author, "Frank Herbert");
        assert_eq!(created.year, 1965);

        let request = test::TestRequest::get().uri(&location).to_request();
        let fetched: Book = test::call_and_read_body_json(&app, request).await;
        assert_eq!(fetched, created);
    }

    #[actix_web::test]
    /// Tests if year 0 and string years are accepted on create
    async fn test_create_with_edge_case_years() {
        let app = test::init_service(build_app(in_memory_gateway().await)).await;

        let book = create_book!(app, json!({"title": "Epic", "author": "Anon", "year": 0}));
        assert_eq!(book.year, 0);

        let book = create_book!(app, json!({"title": "Odd", "author": "Anon", "year": "2020abc"}));
        assert_eq!(book.year, 2020);

        // Exponent notation, so only the leading digit is read
        let book = create_book!(app, json!({"title": "Huge", "author": "Anon", "year": 1e21}));
        assert_eq!(book.year, 1);
    }

    #[actix_web::test]
    /// Tests validation failures of create
    async fn test_create_validation_errors() {
        let app = test::init_service(build_app(in_memory_gateway().await)).await;

        expect_error!(
            app,
            test::TestRequest::post()
                .uri("/books")
                .set_json(json!({"title": "Dune", "year": 1965})),
            StatusCode::BAD_REQUEST,
            "title, author and year are required"
        );
        expect_error!(
            app,
            test::TestRequest::post()
                .uri("/books")
                .set_json(json!({"title": "  ", "author": "Frank Herbert", "year": 1965})),
            StatusCode::BAD_REQUEST,
            "title cannot be empty"
        );
        expect_error!(
            app,
            test::TestRequest::post()
                .uri("/books")
                .set_json(json!({"title": "Dune", "author": "Frank Herbert", "year": "soon"})),
            StatusCode::BAD_REQUEST,
            "year must be a number"
        );
        expect_error!(
            app,
            test::TestRequest::post()
                .uri("/books")
                .set_json(json!({"title": "Dune", "author": "Frank Herbert", "year": null})),
            StatusCode::BAD_REQUEST,
            "year must be a number"
        );
        expect_error!(
            app,
            test::TestRequest::post()
                .uri("/books")
                .set_json(json!({"title": "Dune", "author": "Frank Herbert", "year": 3001})),
            StatusCode::BAD_REQUEST,
            "year seems invalid"
        );
        expect_error!(
            app,
            test::TestRequest::post()
                .uri("/books")
                .insert_header(("content-type", "application/json"))
                .set_payload("{not json"),
            StatusCode::BAD_REQUEST,
            "invalid request body"
        );

        let books: Vec<Book> =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/books").to_request())
                .await;
        assert!(books.is_empty());
    }

    #[actix_web::test]
    /// Tests filters and ordering of the list endpoint
    async fn test_list_books_with_filters() {
        let app = test::init_service(build_app(in_memory_gateway().await)).await;

        let foo = create_book!(app, json!({"title": "Foo Fighters", "author": "Dave", "year": 1995}));
        create_book!(app, json!({"title": "Bar", "author": "Dave", "year": 1995}));
        let food = create_book!(app, json!({"title": "the food of gods", "author": "Wells", "year": 1904}));

        let request = test::TestRequest::get().uri("/books?title=Foo").to_request();
        let books: Vec<Book> = test::call_and_read_body_json(&app, request).await;
        let ids: Vec<_> = books.iter().map(|book| book.id).collect();
        assert_eq!(ids, vec![food.id, foo.id]);

        let request = test::TestRequest::get()
            .uri("/books?author=dave&year=1995")
            .to_request();
        let books: Vec<Book> = test::call_and_read_body_json(&app, request).await;
        assert_eq!(books.len(), 2);
        assert!(books[0].id > books[1].id);

        let request = test::TestRequest::get().uri("/books?year=1800").to_request();
        let books: Vec<Book> = test::call_and_read_body_json(&app, request).await;
        assert!(books.is_empty());

        expect_error!(
            app,
            test::TestRequest::get().uri("/books?year=abc"),
            StatusCode::BAD_REQUEST,
            "year filter must be a number"
        );
    }

    #[actix_web::test]
    /// Tests invalid and missing ids on get
    async fn test_get_book_errors() {
        let app = test::init_service(build_app(in_memory_gateway().await)).await;

        expect_error!(
            app,
            test::TestRequest::get().uri("/books/abc"),
            StatusCode::BAD_REQUEST,
            "invalid id"
        );
        expect_error!(
            app,
            test::TestRequest::get().uri("/books/42"),
            StatusCode::NOT_FOUND,
            "book not found"
        );

        let book = create_book!(app, json!({"title": "T", "author": "A", "year": 1}));
        let request = test::TestRequest::get()
            .uri(&format!("/books/{}abc", book.id))
            .to_request();
        let fetched: Book = test::call_and_read_body_json(&app, request).await;
        assert_eq!(fetched.id, book.id);
    }

    #[actix_web::test]
    /// Tests if a partial update changes only the given field and advances updated_at
    async fn test_partial_update_round_trip() {
        let app = test::init_service(build_app(in_memory_gateway().await)).await;

        let created = create_book!(app, json!({"title": "Dune", "author": "Frank Herbert", "year": 1965}));
        // Timestamps have millisecond precision
        tokio::time::sleep(Duration::from_millis(20)).await;

        let request = test::TestRequest::patch()
            .uri(&format!("/books/{}", created.id))
            .set_json(json!({"year": 1966}))
            .to_request();
        let updated: Book = test::call_and_read_body_json(&app, request).await;
        assert_eq!(updated.year, 1966);

        let request = test::TestRequest::get()
            .uri(&format!("/books/{}", created.id))
            .to_request();
        let fetched: Book = test::call_and_read_body_json(&app, request).await;
        assert_eq!(fetched, updated);
        assert_eq!(fetched.title, created.title);
        assert_eq!(fetched.author, created.author);
        assert_eq!(fetched.created_at, created.created_at);
        assert!(fetched.updated_at > created.updated_at);

        let request = test::TestRequest::put()
            .uri(&format!("/books/{}", created.id))
            .set_json(json!({"title": " Dune Messiah "}))
            .to_request();
        let updated: Book = test::call_and_read_body_json(&app, request).await;
        assert_eq!(updated.title, "Dune Messiah");
        assert_eq!(updated.year, 1966);
    }

    #[actix_web::test]
    /// Tests every way an update can be rejected
    async fn test_update_errors() {
        let app = test::init_service(build_app(in_memory_gateway().await)).await;
        let book = create_book!(app, json!({"title": "Dune", "author": "Frank Herbert", "year": 1965}));
        let uri = format!("/books/{}", book.id);

        expect_error!(
            app,
            test::TestRequest::patch().uri(&uri).set_json(json!({})),
            StatusCode::BAD_REQUEST,
            "request body is empty"
        );
        expect_error!(
            app,
            test::TestRequest::patch()
                .uri(&uri)
                .set_json(json!({"isbn": "978-0441013593"})),
            StatusCode::BAD_REQUEST,
            "no valid fields to update"
        );
        expect_error!(
            app,
            test::TestRequest::patch().uri(&uri).set_json(json!({"author": ""})),
            StatusCode::BAD_REQUEST,
            "author cannot be empty"
        );
        // A sent null is a value, not a missing key
        expect_error!(
            app,
            test::TestRequest::patch().uri(&uri).set_json(json!({"year": null})),
            StatusCode::BAD_REQUEST,
            "year must be a number"
        );
        expect_error!(
            app,
            test::TestRequest::patch().uri(&uri).set_json(json!({"title": null})),
            StatusCode::BAD_REQUEST,
            "title cannot be empty"
        );
        expect_error!(
            app,
            test::TestRequest::patch().uri(&uri).set_json(json!({"year": -5})),
            StatusCode::BAD_REQUEST,
            "year seems invalid"
        );
        expect_error!(
            app,
            test::TestRequest::patch()
                .uri("/books/nope")
                .set_json(json!({"year": 2000})),
            StatusCode::BAD_REQUEST,
            "invalid id"
        );
        expect_error!(
            app,
            test::TestRequest::patch()
                .uri("/books/99999")
                .set_json(json!({"year": 2000})),
            StatusCode::NOT_FOUND,
            "book not found"
        );

        let request = test::TestRequest::get().uri(&uri).to_request();
        let unchanged: Book = test::call_and_read_body_json(&app, request).await;
        assert_eq!(unchanged, book);
    }

    #[actix_web::test]
    /// Tests if a book can only be deleted once
    async fn test_delete_twice() {
        let app = test::init_service(build_app(in_memory_gateway().await)).await;
        let book = create_book!(app, json!({"title": "Gone", "author": "Soon", "year": 2024}));
        let uri = format!("/books/{}", book.id);

        let response =
            test::call_service(&app, test::TestRequest::delete().uri(&uri).to_request()).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let body = test::read_body(response).await;
        assert!(body.is_empty());

        expect_error!(
            app,
            test::TestRequest::delete().uri(&uri),
            StatusCode::NOT_FOUND,
            "book not found"
        );
        expect_error!(
            app,
            test::TestRequest::delete().uri("/books/x"),
            StatusCode::BAD_REQUEST,
            "invalid id"
        );
        expect_error!(
            app,
            test::TestRequest::get().uri(&uri),
            StatusCode::NOT_FOUND,
            "book not found"
        );
    }

    #[actix_web::test]
    /// Tests the unmatched route responder and the health endpoint
    async fn test_unknown_route_and_health() {
        let app = test::init_service(build_app(in_memory_gateway().await)).await;

        expect_error!(
            app,
            test::TestRequest::get().uri("/authors"),
            StatusCode::NOT_FOUND,
            "Not Found"
        );
        // Unsupported methods on known paths look like unknown routes
        expect_error!(
            app,
            test::TestRequest::post().uri("/books/1"),
            StatusCode::NOT_FOUND,
            "Not Found"
        );
        expect_error!(
            app,
            test::TestRequest::delete().uri("/books"),
            StatusCode::NOT_FOUND,
            "Not Found"
        );

        let response =
            test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[actix_web::test]
    /// Tests if storage failures become a generic 500
    async fn test_storage_failure_is_internal_error() {
        let gateway = in_memory_gateway().await;
        let app = test::init_service(build_app(gateway.clone())).await;
        gateway.close().await;

        expect_error!(
            app,
            test::TestRequest::get().uri("/books"),
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error"
        );
    }
}
