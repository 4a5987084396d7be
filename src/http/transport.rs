use reqwest::{multipart, Method};

use super::request::{Body, PartValue, RequestDescriptor, Response};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("reqwest: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("query encoding: {0}")]
    Query(#[from] serde_urlencoded::ser::Error),
}

/// Performs the network call for a fully prepared descriptor.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RequestDescriptor) -> Result<Response, Error>;
}

pub struct ReqwestTransport {
    pub client: reqwest::Client,
    pub base_url: String,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn build_url(&self, request: &RequestDescriptor) -> Result<String, Error> {
        let base = self.base_url.trim_end_matches('/');
        let path = request.path();
        let separator = if path.starts_with('/') { "" } else { "/" };
        if request.query().is_empty() {
            return Ok(format!("{base}{separator}{path}"));
        }
        let query = serde_urlencoded::to_string(request.query())?;
        Ok(format!("{base}{separator}{path}?{query}"))
    }

    fn build_request(&self, request: &RequestDescriptor) -> Result<reqwest::Request, Error> {
        let url = self.build_url(request)?;
        let method = request.method().clone();

        let builder = self
            .client
            .request(method.clone(), url)
            .headers(request.headers().clone());

        let builder = match request.body() {
            Body::Json(value) => builder.json(value),
            Body::Multipart(parts) => builder.multipart(Self::build_form(parts)?),
            Body::Empty if method == Method::POST || method == Method::PUT => {
                builder.header(reqwest::header::CONTENT_LENGTH, 0)
            }
            Body::Empty => builder,
        };

        builder.build().map_err(Error::Reqwest)
    }

    fn build_form(parts: &[super::request::Part]) -> Result<multipart::Form, Error> {
        let mut form = multipart::Form::new();
        for part in parts {
            form = match &part.value {
                PartValue::Text(text) => form.text(part.name.clone(), text.clone()),
                PartValue::File {
                    file_name,
                    mime,
                    bytes,
                } => {
                    let file = multipart::Part::bytes(bytes.clone()).file_name(file_name.clone());
                    let file = match mime {
                        Some(mime) => file.mime_str(mime)?,
                        None => file,
                    };
                    form.part(part.name.clone(), file)
                }
            };
        }
        Ok(form)
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<Response, Error> {
        let req = self.build_request(request)?;
        let res = self.client.execute(req).await?;
        let status = res.status();
        let body = res.bytes().await?.to_vec();
        Ok(Response::new(status, body))
    }
}
