//! Replayable request descriptors and buffered responses.

use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Method, StatusCode,
};
use serde::de::DeserializeOwned;

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<Part>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartValue {
    Text(String),
    File {
        file_name: String,
        mime: Option<String>,
        bytes: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub value: PartValue,
}

impl Part {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: PartValue::Text(value.into()),
        }
    }

    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime: Option<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            value: PartValue::File {
                file_name: file_name.into(),
                mime,
                bytes,
            },
        }
    }
}

/// Everything needed to send a request again.
///
/// Descriptors are never mutated in place: every adjustment, including the
/// retry counter, produces a new value.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Body,
    attempt: u32,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: Body::Empty,
            attempt: 0,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn with_header(mut self, name: reqwest::header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_json(self, body: serde_json::Value) -> Self {
        self.with_body(Body::Json(body))
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// Attach `token` as a bearer credential, or strip any credential when `None`.
    pub fn authorized(mut self, token: Option<&str>) -> Self {
        match token.and_then(|token| HeaderValue::from_str(&format!("Bearer {token}")).ok()) {
            Some(mut value) => {
                value.set_sensitive(true);
                self.headers.insert(AUTHORIZATION, value);
            }
            None => {
                self.headers.remove(AUTHORIZATION);
            }
        }
        self
    }

    /// A copy marked as retried once more.
    pub fn retried(&self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self.clone()
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    body: Vec<u8>,
}

impl Response {
    pub fn new(status: StatusCode, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retried_leaves_original_untouched() {
        let original = RequestDescriptor::get("/courses").with_query("page", 0);
        let retry = original.retried();
        assert_eq!(original.attempt(), 0);
        assert_eq!(retry.attempt(), 1);
        assert_eq!(retry.retried().attempt(), 2);
        assert_eq!(retry.query(), original.query());
    }

    #[test]
    fn authorized_sets_and_strips_bearer() {
        let request = RequestDescriptor::get("/courses").authorized(Some("t1"));
        assert_eq!(request.bearer_token(), Some("t1"));

        let request = request.authorized(Some("t2"));
        assert_eq!(request.bearer_token(), Some("t2"));

        let request = request.authorized(None);
        assert_eq!(request.bearer_token(), None);
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }
}
