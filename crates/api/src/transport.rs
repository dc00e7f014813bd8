//! Wire transport: turns an `ApiRequest` into one HTTP exchange
//!
//! No retries and no auth here. Non-2xx responses become `Error::Status`
//! carrying the body text so callers can surface the backend's message.

use reqwest::header::HeaderValue;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::error::{Error, Result};
use crate::metrics;
use crate::request::{ApiRequest, ApiResponse, Encoding, PartValue, RequestBody};

/// Header carrying the per-call request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// HTTP transport bound to one API base URL.
#[derive(Clone)]
pub struct Transport {
    client: reqwest::Client,
    base_url: String,
}

impl Transport {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Underlying HTTP client, shared with the refresh exchange.
    pub fn http_client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Absolute URL for a path relative to the base URL.
    pub fn url_for(&self, path: &str) -> String {
        if path.is_empty() {
            self.base_url.clone()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Send one request and read the whole response.
    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = self.url_for(&request.path);

        let mut headers = request.headers.clone();
        if let Ok(id) = HeaderValue::from_str(&request.request_id) {
            headers.insert(REQUEST_ID_HEADER, id);
        }

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .headers(headers);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        builder = match (&request.body, request.encoding) {
            (None, _) => builder,
            (Some(RequestBody::Json(value)), Encoding::Json) => builder.json(value),
            (Some(RequestBody::Form(parts)), Encoding::Multipart) => {
                builder.multipart(build_form(parts)?)
            }
            (Some(RequestBody::Json(_)), Encoding::Multipart) => {
                return Err(Error::InvalidRequest(
                    "multipart encoding requires form parts, got a JSON body".into(),
                ));
            }
            (Some(RequestBody::Form(_)), Encoding::Json) => {
                return Err(Error::InvalidRequest(
                    "form parts require multipart encoding".into(),
                ));
            }
        };

        let response = builder.send().await.map_err(|e| {
            metrics::record_transport_error(e.is_timeout());
            Error::transport(e)
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(Error::transport)?;

        metrics::record_request(request.method.as_str(), status.as_u16());
        debug!(%status, bytes = body.len(), "backend responded");

        if !status.is_success() {
            return Err(Error::Status {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

/// Build a multipart form. Parts are rebuilt from owned bytes on every send,
/// which is what makes a multipart request replayable.
fn build_form(parts: &[crate::request::FormPart]) -> Result<Form> {
    let mut form = Form::new();
    for part in parts {
        form = match &part.value {
            PartValue::Text(text) => form.text(part.name.clone(), text.clone()),
            PartValue::File {
                file_name,
                mime,
                bytes,
            } => {
                let mut file = Part::bytes(bytes.to_vec()).file_name(file_name.clone());
                if let Some(mime) = mime {
                    file = file.mime_str(mime).map_err(|e| {
                        Error::InvalidRequest(format!("invalid mime type {mime:?}: {e}"))
                    })?;
                }
                form.part(part.name.clone(), file)
            }
        };
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::FormPart;
    use crate::test_support::{MockBackend, Reply};
    use reqwest::StatusCode;

    #[test]
    fn url_for_joins_with_single_slash() {
        let transport = Transport::new(reqwest::Client::new(), "http://localhost:8088/api/v1/");
        assert_eq!(transport.base_url(), "http://localhost:8088/api/v1");
        assert_eq!(
            transport.url_for("/products"),
            "http://localhost:8088/api/v1/products"
        );
        assert_eq!(
            transport.url_for("products"),
            "http://localhost:8088/api/v1/products"
        );
        assert_eq!(transport.url_for(""), "http://localhost:8088/api/v1");
    }

    #[tokio::test]
    async fn sends_json_body_and_query() {
        let backend = MockBackend::start().await;
        let transport = Transport::new(reqwest::Client::new(), backend.base_url());

        let request = ApiRequest::post("/products/search")
            .json(serde_json::json!({"keyword": "mug"}))
            .query("page", "0")
            .query("sortField", "id");
        let response = transport.send(&request).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);

        let seen = backend.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, "POST");
        assert_eq!(seen[0].path, "/api/v1/products/search");
        assert_eq!(seen[0].query, "page=0&sortField=id");
        assert_eq!(seen[0].header("content-type").as_deref(), Some("application/json"));
        assert_eq!(seen[0].header(REQUEST_ID_HEADER), Some(request.request_id.clone()));
        let body: serde_json::Value = serde_json::from_str(&seen[0].body).unwrap();
        assert_eq!(body["keyword"], "mug");
    }

    #[tokio::test]
    async fn request_id_header_is_sent_once() {
        let backend = MockBackend::start().await;
        let transport = Transport::new(reqwest::Client::new(), backend.base_url());

        let request = ApiRequest::get("/orders")
            .header(REQUEST_ID_HEADER, "caller-chosen")
            .unwrap();
        transport.send(&request).await.unwrap();

        let seen = backend.requests();
        let ids: Vec<_> = seen[0]
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(REQUEST_ID_HEADER))
            .collect();
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].1, request.request_id);
    }

    #[tokio::test]
    async fn query_values_are_url_encoded() {
        let backend = MockBackend::start().await;
        let transport = Transport::new(reqwest::Client::new(), backend.base_url());

        let request = ApiRequest::post("/products")
            .form(vec![FormPart::text("note", "x")])
            .query("requestDTO", r#"{"name":"Blue Mug"}"#);
        transport.send(&request).await.unwrap();

        let seen = backend.requests();
        assert!(
            seen[0].query.starts_with("requestDTO=%7B%22name%22"),
            "got: {}",
            seen[0].query
        );
    }

    #[tokio::test]
    async fn sends_multipart_form() {
        let backend = MockBackend::start().await;
        let transport = Transport::new(reqwest::Client::new(), backend.base_url());

        let request = ApiRequest::post("/products").form(vec![
            FormPart::text("name", "Mug"),
            FormPart::file("image", "mug.png", b"PNGDATA".to_vec()).with_mime("image/png"),
        ]);
        transport.send(&request).await.unwrap();

        let seen = backend.requests();
        let content_type = seen[0].header("content-type").unwrap();
        assert!(
            content_type.starts_with("multipart/form-data; boundary="),
            "got: {content_type}"
        );
        assert!(seen[0].body.contains("name=\"name\""));
        assert!(seen[0].body.contains("filename=\"mug.png\""));
        assert!(seen[0].body.contains("PNGDATA"));
    }

    #[tokio::test]
    async fn non_2xx_becomes_status_error_with_body() {
        let backend = MockBackend::start().await;
        backend.reply("/orders/9", Reply::status(StatusCode::NOT_FOUND, r#"{"message":"no order"}"#));
        let transport = Transport::new(reqwest::Client::new(), backend.base_url());

        let err = transport.send(&ApiRequest::get("/orders/9")).await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert!(err.to_string().contains("no order"));
    }

    #[tokio::test]
    async fn mismatched_body_and_encoding_is_rejected() {
        let transport = Transport::new(reqwest::Client::new(), "http://127.0.0.1:9");
        let mut request = ApiRequest::post("/x").json(serde_json::json!({}));
        request.encoding = Encoding::Multipart;

        let err = transport.send(&request).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)), "got: {err}");
    }

    #[tokio::test]
    async fn connection_refused_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = Transport::new(reqwest::Client::new(), format!("http://{addr}"));
        let err = transport.send(&ApiRequest::get("/")).await.unwrap_err();
        assert!(matches!(err, Error::Transport { .. }), "got: {err}");
        assert!(!err.is_unauthorized());
    }
}
