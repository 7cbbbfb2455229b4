use anyhow::{bail, Context};
use reqwest::{Response, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;

use crate::api::{Book, BookFilter, BookId, BookPayload, ErrorResponse};

pub struct BookManagerClient {
    url: String,
    client: ClientWithMiddleware,
}

impl BookManagerClient {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .build()
            .context("Failed to build reqwest client")?;
        let client = ClientBuilder::new(reqwest_client)
            // Insert the tracing middleware
            .with(TracingMiddleware::default())
            .build();

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Calls POST /books endpoint
    /// Returns the stored book, fails with the server message if the book was rejected
    pub async fn create_book(&self, payload: &BookPayload) -> anyhow::Result<Book> {
        let response = self
            .client
            .post(format!("{}/books", self.url))
            .json(payload)
            .send()
            .await?;

        if response.status() != StatusCode::CREATED {
            bail!("Failed to create book {}", error_message(response).await)
        }
        Ok(response.json().await?)
    }

    /// Calls GET /books endpoint with the given filters
    pub async fn list_books(&self, filter: &BookFilter) -> anyhow::Result<Vec<Book>> {
        let response = self
            .client
            .get(format!("{}/books", self.url))
            .query(filter)
            .send()
            .await?;

        if !response.status().is_success() {
            bail!("Failed to list books {}", error_message(response).await)
        }
        Ok(response.json().await?)
    }

    /// Calls GET /books/{book_id} endpoint
    /// Returns None if the book is not in the store
    pub async fn get_book(&self, book_id: BookId) -> anyhow::Result<Option<Book>> {
        let response = self
            .client
            .get(format!("{}/books/{}", self.url, book_id))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            Ok(None)
        } else if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            bail!("Failed to get book {}", error_message(response).await)
        }
    }

    /// Calls PATCH /books/{book_id} endpoint
    /// Returns the updated book, None if the book is not in the store
    pub async fn update_book(
        &self,
        book_id: BookId,
        payload: &BookPayload,
    ) -> anyhow::Result<Option<Book>> {
        let response = self
            .client
            .patch(format!("{}/books/{}", self.url, book_id))
            .json(payload)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            Ok(None)
        } else if response.status().is_success() {
            Ok(Some(response.json().await?))
        } else {
            bail!("Failed to update book {}", error_message(response).await)
        }
    }

    /// Calls DELETE /books/{book_id} endpoint
    /// Returns true if the book was deleted and false if it was not found
    pub async fn delete_book(&self, book_id: BookId) -> anyhow::Result<bool> {
        let response = self
            .client
            .delete(format!("{}/books/{}", self.url, book_id))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            Ok(false)
        } else if response.status().is_success() {
            Ok(true)
        } else {
            bail!("Failed to delete book {}", error_message(response).await)
        }
    }
}

async fn error_message(response: Response) -> String {
    let status = response.status();
    match response.json::<ErrorResponse>().await {
        Ok(body) => format!("({}): {}", status, body.error),
        Err(_) => format!("({})", status),
    }
}
