use crate::api::{BookFilter, BookId};
use crate::validation::{parse_leading_int, BookFields, NewBook, ValidationError};

/// SQLite expression for the current time, stored as ISO-8601 UTC with milliseconds
pub const NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    Text(String),
    Integer(i64),
}

/// Parameterized SQL text together with its bound parameters, in placeholder order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl Statement {
    fn new(sql: impl Into<String>, params: Vec<SqlParam>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

pub fn insert_book(book: &NewBook) -> Statement {
    Statement::new(
        "INSERT INTO books (title, author, year) VALUES (?, ?, ?)",
        vec![
            SqlParam::Text(book.title.clone()),
            SqlParam::Text(book.author.clone()),
            SqlParam::Integer(book.year),
        ],
    )
}

pub fn select_book(book_id: BookId) -> Statement {
    Statement::new(
        "SELECT * FROM books WHERE id = ?",
        vec![SqlParam::Integer(book_id)],
    )
}

pub fn delete_book(book_id: BookId) -> Statement {
    Statement::new(
        "DELETE FROM books WHERE id = ?",
        vec![SqlParam::Integer(book_id)],
    )
}

/// Builds the list query. Empty filter values are ignored, title and author
/// match as substrings, year must match exactly. Newest ids come first.
pub fn list_books(filter: &BookFilter) -> Result<Statement, ValidationError> {
    let mut conditions = vec![];
    let mut params = vec![];

    if let Some(title) = filter.title.as_deref().filter(|t| !t.is_empty()) {
        conditions.push("title LIKE ?");
        params.push(SqlParam::Text(format!("%{}%", title)));
    }
    if let Some(author) = filter.author.as_deref().filter(|a| !a.is_empty()) {
        conditions.push("author LIKE ?");
        params.push(SqlParam::Text(format!("%{}%", author)));
    }
    if let Some(year) = filter.year.as_deref().filter(|y| !y.is_empty()) {
        let year = parse_leading_int(year).ok_or(ValidationError::YearFilterNotANumber)?;
        conditions.push("year = ?");
        params.push(SqlParam::Integer(year));
    }

    let mut sql = "SELECT * FROM books".to_string();
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql.push_str(" ORDER BY id DESC");

    Ok(Statement::new(sql, params))
}

/// Builds a partial update touching only the fields present in `fields`.
/// `updated_at` is always refreshed and the id is bound last.
pub fn update_book(book_id: BookId, fields: &BookFields) -> Result<Statement, ValidationError> {
    let mut assignments = vec![];
    let mut params = vec![];

    if let Some(title) = &fields.title {
        assignments.push("title = ?".to_string());
        params.push(SqlParam::Text(title.clone()));
    }
    if let Some(author) = &fields.author {
        assignments.push("author = ?".to_string());
        params.push(SqlParam::Text(author.clone()));
    }
    if let Some(year) = fields.year {
        assignments.push("year = ?".to_string());
        params.push(SqlParam::Integer(year));
    }

    if assignments.is_empty() {
        return Err(ValidationError::NoFieldsToUpdate);
    }

    assignments.push(format!("updated_at = {}", NOW));
    params.push(SqlParam::Integer(book_id));

    Ok(Statement::new(
        format!("UPDATE books SET {} WHERE id = ?", assignments.join(", ")),
        params,
    ))
}
