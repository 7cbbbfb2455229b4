use crate::api::{BookPayload, YearValue};

pub const MIN_YEAR: i64 = 0;
pub const MAX_YEAR: i64 = 3000;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("title, author and year are required")]
    MissingRequiredFields,

    #[error("title cannot be empty")]
    EmptyTitle,

    #[error("author cannot be empty")]
    EmptyAuthor,

    #[error("year must be a number")]
    YearNotANumber,

    #[error("year seems invalid")]
    YearOutOfRange,

    #[error("year filter must be a number")]
    YearFilterNotANumber,

    #[error("request body is empty")]
    EmptyBody,

    #[error("no valid fields to update")]
    NoFieldsToUpdate,

    #[error("invalid id")]
    InvalidId,

    #[error("invalid request body")]
    InvalidBody,

    #[error("invalid query string")]
    InvalidQuery,
}

/// Fields of a payload that passed validation, trimmed and parsed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFields {
    pub title: Option<String>,
    pub author: Option<String>,
    pub year: Option<i64>,
}

/// All fields of a book about to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub year: i64,
}

impl BookFields {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.author.is_none() && self.year.is_none()
    }

    pub fn into_new_book(self) -> Result<NewBook, ValidationError> {
        match self {
            BookFields {
                title: Some(title),
                author: Some(author),
                year: Some(year),
            } => Ok(NewBook {
                title,
                author,
                year,
            }),
            _ => Err(ValidationError::MissingRequiredFields),
        }
    }
}

/// Validates the payload of create (`require_all_fields`) or update.
/// Rules are checked in order and the first failure is returned.
pub fn validate(
    payload: &BookPayload,
    require_all_fields: bool,
) -> Result<BookFields, ValidationError> {
    if require_all_fields {
        let has_title = matches!(&payload.title, Some(Some(title)) if !title.is_empty());
        let has_author = matches!(&payload.author, Some(Some(author)) if !author.is_empty());
        if !has_title || !has_author || payload.year.is_none() {
            return Err(ValidationError::MissingRequiredFields);
        }
    }

    let title = non_blank(payload.title.as_ref(), ValidationError::EmptyTitle)?;
    let author = non_blank(payload.author.as_ref(), ValidationError::EmptyAuthor)?;

    let year = match &payload.year {
        Some(value) => {
            // A `null` year is sent but is not a number
            let year = value
                .as_ref()
                .and_then(parse_year)
                .ok_or(ValidationError::YearNotANumber)?;
            if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
                return Err(ValidationError::YearOutOfRange);
            }
            Some(year)
        }
        None => None,
    };

    Ok(BookFields {
        title,
        author,
        year,
    })
}

/// A sent `null` is rejected like a blank string
fn non_blank(
    value: Option<&Option<String>>,
    error: ValidationError,
) -> Result<Option<String>, ValidationError> {
    match value {
        None => Ok(None),
        Some(Some(text)) if !text.trim().is_empty() => Ok(Some(text.trim().to_string())),
        Some(_) => Err(error),
    }
}

/// Integer part of a year, the way it would be read from the number's decimal text.
/// Very large and very small numbers are written with an exponent, so only their
/// leading digit counts: `1e21` gives 1.
pub fn parse_year(value: &YearValue) -> Option<i64> {
    match value {
        YearValue::Text(text) => parse_leading_int(text),
        YearValue::Number(number) => number.as_i64().or_else(|| {
            let number = number.as_f64().filter(|n| n.is_finite())?;
            let magnitude = number.abs();
            if magnitude >= 1e21 || (magnitude != 0.0 && magnitude < 1e-6) {
                parse_leading_int(&format!("{:e}", number))
            } else {
                // `as` saturates for values beyond the i64 range
                Some(number.trunc() as i64)
            }
        }),
    }
}

/// Parses the leading base-10 integer of `input`, ignoring anything after it.
/// `"2020abc"` gives 2020, `"abc"` gives None. Overflow saturates.
pub fn parse_leading_int(input: &str) -> Option<i64> {
    let input = input.trim_start();
    let (negative, digits) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        _ => (false, input),
    };

    let digits: Vec<i64> = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .map(|digit| i64::from(digit - b'0'))
        .collect();
    if digits.is_empty() {
        return None;
    }

    let magnitude = digits.iter().fold(0i64, |acc, digit| {
        acc.saturating_mul(10).saturating_add(*digit)
    });
    Some(if negative { -magnitude } else { magnitude })
}
