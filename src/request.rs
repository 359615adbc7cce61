//! Request descriptors and bodies.
//!
//! A [`RequestDescriptor`] is built once per logical call and shared,
//! unmodified, by every attempt of that call.

use crate::{Error, Result};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use std::path::Path;
use url::Url;

/// Everything needed to issue one HTTP request.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// The HTTP method.
    pub method: Method,

    /// The fully qualified target.
    pub url: Url,

    /// Headers specific to this request, applied after the client defaults.
    pub headers: HeaderMap,

    /// Optional request body.
    pub body: Option<Body>,
}

impl RequestDescriptor {
    /// Creates a descriptor with no extra headers and no body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Adds a header to the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Sets the request body.
    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }
}

/// A request payload.
///
/// Bodies are kept in a re-sendable form: a retried attempt sends exactly the
/// same bytes as the first.
#[derive(Debug, Clone)]
pub enum Body {
    /// A JSON document.
    Json(serde_json::Value),

    /// Pre-encoded text sent as `application/json`.
    Text(String),

    /// Raw bytes with an explicit content type.
    Bytes {
        /// The payload
        content: Bytes,
        /// Value of the `Content-Type` header
        content_type: String,
    },

    /// Files uploaded as `multipart/form-data`, each under the field `file`.
    Attachments(Vec<Attachment>),
}

impl Body {
    /// Serializes `value` into a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationFailed`] if `value` cannot be represented
    /// as JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(Body::Json)
            .map_err(|e| Error::SerializationFailed(e.to_string()))
    }

    /// Sends `raw` as a bare JSON string.
    ///
    /// Some endpoints take a single quoted string rather than an object.
    ///
    /// # Examples
    ///
    /// ```
    /// use ratewise::Body;
    ///
    /// match Body::quoted("say \"hi\"") {
    ///     Body::Text(text) => assert_eq!(text, r#""say \"hi\"""#),
    ///     _ => unreachable!(),
    /// }
    /// ```
    pub fn quoted(raw: &str) -> Self {
        Body::Text(serde_json::Value::String(raw.to_string()).to_string())
    }

    /// Raw bytes with the given content type.
    pub fn bytes(content: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Body::Bytes {
            content: content.into(),
            content_type: content_type.into(),
        }
    }

    /// Files sent as one `multipart/form-data` request.
    pub fn attachments(attachments: impl IntoIterator<Item = Attachment>) -> Self {
        Body::Attachments(attachments.into_iter().collect())
    }

    /// Applies this body to an outgoing request.
    pub(crate) fn apply(&self, request: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder> {
        let request = match self {
            Body::Json(value) => request.json(value),
            Body::Text(text) => request
                .header(CONTENT_TYPE, "application/json")
                .body(text.clone()),
            Body::Bytes {
                content,
                content_type,
            } => request
                .header(CONTENT_TYPE, content_type.as_str())
                .body(content.clone()),
            Body::Attachments(attachments) => {
                let mut form = Form::new();
                for attachment in attachments {
                    form = form.part("file", attachment.to_part()?);
                }
                request.multipart(form)
            }
        };
        Ok(request)
    }
}

/// One file of a multipart upload.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// File name reported to the server.
    pub filename: String,

    /// File contents.
    pub content: Bytes,

    /// Optional MIME type of the part.
    pub content_type: Option<String>,
}

impl Attachment {
    /// Creates an attachment without an explicit MIME type.
    pub fn new(filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
            content_type: None,
        }
    }

    /// Reads a file from disk, named after the last path component and sent
    /// as `application/octet-stream`.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read(path).await.map_err(|source| Error::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());

        Ok(Self::new(filename, content).with_content_type("application/octet-stream"))
    }

    /// Sets the MIME type of the part.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    fn to_part(&self) -> Result<Part> {
        let part = Part::bytes(self.content.to_vec()).file_name(self.filename.clone());
        match &self.content_type {
            Some(mime) => part.mime_str(mime).map_err(|e| {
                Error::Configuration(format!("Invalid attachment content type {}: {}", mime, e))
            }),
            None => Ok(part),
        }
    }
}
