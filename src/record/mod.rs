//! Response records
//!
//! This module defines the normalized form of a fetched page
//! ([`ResponseRecord`]) together with the raw [`Request`]/[`Response`] types
//! exchanged with the fetcher, and the conversions between them:
//!
//! - fetched [`Response`] → [`ResponseRecord`] (decode headers and body)
//! - [`ResponseRecord`] ↔ [`PageRow`] (headers as JSON text for the store)
//! - [`ResponseRecord`] → replayed [`Response`] (re-encode to raw bytes)

mod charset;
mod response;

pub use charset::{decode_text, encode_text, header_encoding, lookup_encoding};
pub use response::{RawHeaders, Request, Response};

use crate::storage::PageRow;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

/// Decoded response headers; HTTP allows a name to repeat, so every name maps
/// to the ordered list of its values.
pub type Headers = BTreeMap<String, Vec<String>>;

/// Errors that can occur while converting between response representations
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Malformed stored headers for {url}: {source}")]
    MalformedHeaders {
        url: String,
        source: serde_json::Error,
    },

    #[error("Failed to serialize headers: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Content is not valid {encoding}")]
    Decode { encoding: String },

    #[error("Content cannot be represented in {encoding}")]
    Encode { encoding: String },
}

/// Result type for record conversions
pub type RecordResult<T> = Result<T, RecordError>;

/// A fetched page in normalized, text form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    pub url: String,
    pub status: u16,
    pub encoding: String,
    pub headers: Headers,
    pub body: String,
    /// Server `Date` header, if present and parseable
    pub date: Option<DateTime<Utc>>,
}

impl ResponseRecord {
    /// Builds a record from a fetched (or replayed) response
    ///
    /// Headers and body are decoded with the response's encoding. Bytes that
    /// are not valid in that encoding are an error: the body must stay
    /// re-derivable from raw bytes and encoding.
    pub fn from_response(response: &Response) -> RecordResult<Self> {
        tracing::debug!("Building record from response for URL '{}'", response.url);

        let headers = response.headers.decode(&response.encoding)?;
        let date = find_header(&headers, "date").and_then(|value| parse_http_date(value));
        let body = decode_text(&response.body, &response.encoding)?;

        Ok(Self {
            url: response.url.clone(),
            status: response.status,
            encoding: response.encoding.clone(),
            headers,
            body,
            date,
        })
    }

    /// Converts the record to the textual row stored in the database
    pub fn to_row(&self) -> RecordResult<PageRow> {
        Ok(PageRow {
            id: None,
            url: self.url.clone(),
            status: self.status,
            encoding: self.encoding.clone(),
            headers: encode_headers(&self.headers)?,
            date: self.date,
            body: self.body.clone(),
        })
    }

    /// Rebuilds a record from a stored row
    ///
    /// Fails with [`RecordError::MalformedHeaders`] when the headers column
    /// is not a JSON object of string lists.
    pub fn from_row(row: PageRow) -> RecordResult<Self> {
        let headers = decode_headers(&row.url, &row.headers)?;
        Ok(Self {
            url: row.url,
            status: row.status,
            encoding: row.encoding,
            headers,
            body: row.body,
            date: row.date,
        })
    }
}

/// Serializes headers to the JSON text kept in the `headers` column
pub fn encode_headers(headers: &Headers) -> RecordResult<String> {
    Ok(serde_json::to_string(headers)?)
}

/// Parses the JSON text kept in the `headers` column
pub fn decode_headers(url: &str, text: &str) -> RecordResult<Headers> {
    serde_json::from_str(text).map_err(|source| RecordError::MalformedHeaders {
        url: url.to_string(),
        source,
    })
}

/// Parses an HTTP `Date` header value (RFC 2822 / IMF-fixdate)
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc2822(value.trim()) {
        Ok(date) => Some(date.with_timezone(&Utc)),
        Err(e) => {
            tracing::debug!("Ignoring unparseable Date header '{}': {}", value, e);
            None
        }
    }
}

/// First value of a header, matching the name case-insensitively
fn find_header<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, values)| values.first())
        .map(String::as_str)
}
