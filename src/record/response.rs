//! Raw request and response types
//!
//! A [`Response`] is what the crawl driver receives for a request: either
//! fetched over the network or replayed from the store. Both carry raw bytes
//! for headers and body, exactly as a network response would.

use crate::record::{decode_text, encode_text, header_encoding, Headers, RecordResult, ResponseRecord};

/// An outbound request for a single URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: String,
}

impl Request {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Response headers as raw bytes, in arrival order
///
/// Repeated header names are grouped under their first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawHeaders {
    entries: Vec<(Vec<u8>, Vec<Vec<u8>>)>,
}

impl RawHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value, grouping it with earlier values of the same name
    pub fn append(&mut self, name: &[u8], value: &[u8]) {
        match self.entries.iter_mut().find(|(key, _)| key.as_slice() == name) {
            Some((_, values)) => values.push(value.to_vec()),
            None => self.entries.push((name.to_vec(), vec![value.to_vec()])),
        }
    }

    /// First value of a header, matching the name case-insensitively
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name.as_bytes()))
            .and_then(|(_, values)| values.first())
            .map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[Vec<u8>])> {
        self.entries
            .iter()
            .map(|(key, values)| (key.as_slice(), values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decodes every name and value for a response in the given encoding
    pub fn decode(&self, encoding: &str) -> RecordResult<Headers> {
        let encoding = header_encoding(encoding)?;
        let mut headers = Headers::new();
        for (key, values) in &self.entries {
            let key = decode_text(key, encoding)?;
            let values = values
                .iter()
                .map(|value| decode_text(value, encoding))
                .collect::<RecordResult<Vec<_>>>()?;
            headers.entry(key).or_default().extend(values);
        }
        Ok(headers)
    }

    /// Encodes decoded headers back to bytes for a response in the given
    /// encoding
    pub fn encode(headers: &Headers, encoding: &str) -> RecordResult<Self> {
        let encoding = header_encoding(encoding)?;
        let mut raw = Self::new();
        for (key, values) in headers {
            let key = encode_text(key, encoding)?;
            let values = values
                .iter()
                .map(|value| encode_text(value, encoding))
                .collect::<RecordResult<Vec<_>>>()?;
            raw.entries.push((key, values));
        }
        Ok(raw)
    }
}

/// A response delivered to the crawl driver
#[derive(Debug, Clone)]
pub struct Response {
    /// Final URL of the response
    pub url: String,
    pub status: u16,
    /// Encoding label the headers and body are encoded with
    pub encoding: String,
    pub headers: RawHeaders,
    pub body: Vec<u8>,
    /// The request this response answers
    pub request: Request,
    /// True when the response was synthesized from the store
    pub replayed: bool,
}

impl Response {
    /// Synthesizes a response from a stored record
    ///
    /// Headers and body are re-encoded to bytes with the record's encoding;
    /// the given request becomes the response's request.
    pub fn replayed(record: &ResponseRecord, request: Request) -> RecordResult<Self> {
        Ok(Self {
            url: record.url.clone(),
            status: record.status,
            encoding: record.encoding.clone(),
            headers: RawHeaders::encode(&record.headers, &record.encoding)?,
            body: encode_text(&record.body, &record.encoding)?,
            request,
            replayed: true,
        })
    }

    /// Body decoded with the response's encoding
    pub fn text(&self) -> RecordResult<String> {
        decode_text(&self.body, &self.encoding)
    }
}
