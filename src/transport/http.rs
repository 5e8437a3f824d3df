//! `reqwest`-backed transport and header construction.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, RETRY_AFTER,
};
use reqwest::multipart::{Form, Part};

use super::{PreparedRequest, RawResponse, Transport};
use crate::config::SessionAuth;
use crate::error::ApiError;
use crate::types::{FormPart, MultipartForm, RequestBody, RequestOptions};

/// Header carrying the CSRF token on state-changing requests.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Transport over a cookie-enabled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a client in credentialed mode: cookies from `auth`'s jar are
    /// sent with every request and `Set-Cookie` responses land back in it.
    pub fn new(auth: &SessionAuth, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .cookie_provider(auth.cookie_jar())
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| ApiError::Configuration(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing client (its cookie policy is the caller's business).
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &PreparedRequest) -> Result<RawResponse, ApiError> {
        let mut builder = self
            .client
            .request(request.method.into(), &request.url)
            .headers(request.headers.clone());

        builder = match &request.body {
            None => builder,
            Some(RequestBody::Json(value)) => builder.body(serde_json::to_vec(value)?),
            Some(RequestBody::Bytes { data, .. }) => builder.body(data.clone()),
            Some(RequestBody::Multipart(form)) => builder.multipart(to_reqwest_form(form)?),
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers();
        let retry_after = header_string(headers, RETRY_AFTER);
        let cache_control = header_string(headers, CACHE_CONTROL);
        let body = response.bytes().await?.to_vec();

        Ok(RawResponse {
            status,
            retry_after,
            cache_control,
            body,
        })
    }
}

fn header_string(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn to_reqwest_form(form: &MultipartForm) -> Result<Form, ApiError> {
    let mut out = Form::new();
    for part in &form.parts {
        out = match part {
            FormPart::Text { name, value } => out.text(name.clone(), value.clone()),
            FormPart::File {
                name,
                file_name,
                mime,
                data,
            } => {
                let mut file = Part::bytes(data.clone()).file_name(file_name.clone());
                if let Some(mime) = mime {
                    file = file.mime_str(mime).map_err(|e| {
                        ApiError::Configuration(format!("Invalid MIME type {mime}: {e}"))
                    })?;
                }
                out.part(name.clone(), file)
            }
        };
    }
    Ok(out)
}

/// Build the outgoing headers for a request to `url`.
///
/// Caller headers come first; JSON bodies get `Content-Type:
/// application/json` unless `skip_content_type` is set; state-changing
/// methods carry the CSRF token when one is available; a legacy bearer
/// token adds `Authorization`.
pub fn build_headers(
    options: &RequestOptions,
    url: &str,
    auth: &SessionAuth,
) -> Result<HeaderMap, ApiError> {
    let mut headers = options.headers.clone();

    if !options.skip_content_type {
        match &options.body {
            Some(RequestBody::Json(_)) => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }
            Some(RequestBody::Bytes {
                content_type: Some(ct),
                ..
            }) => {
                headers.insert(CONTENT_TYPE, header_value(ct)?);
            }
            _ => {}
        }
    }

    if options.method.is_state_changing() {
        if let Some(token) = auth.csrf_token(url) {
            headers.insert(CSRF_HEADER, header_value(&token)?);
        }
    }

    if let Some(token) = auth.bearer_token() {
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {token}"))?);
    }

    Ok(headers)
}

fn header_value(value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value)
        .map_err(|_| ApiError::Configuration(format!("Invalid header value: {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HttpMethod;
    use serde_json::json;

    const URL: &str = "http://localhost:3000/api/posts";

    #[test]
    fn json_body_gets_json_content_type() {
        let options = RequestOptions::json(HttpMethod::Post, json!({"a": 1}));
        let headers = build_headers(&options, URL, &SessionAuth::new()).unwrap();
        assert_eq!(headers[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn skip_content_type_suppresses_injection() {
        let mut options = RequestOptions::json(HttpMethod::Post, json!({"a": 1}));
        options.skip_content_type = true;
        let headers = build_headers(&options, URL, &SessionAuth::new()).unwrap();
        assert!(headers.get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn multipart_body_gets_no_content_type() {
        let options = RequestOptions {
            method: HttpMethod::Post,
            body: Some(RequestBody::Multipart(MultipartForm::new().text("k", "v"))),
            ..Default::default()
        };
        let headers = build_headers(&options, URL, &SessionAuth::new()).unwrap();
        assert!(headers.get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn csrf_only_on_state_changing_methods() {
        let auth = SessionAuth::new();
        auth.set_csrf_token("tok");

        let get = build_headers(&RequestOptions::get(), URL, &auth).unwrap();
        assert!(get.get(CSRF_HEADER).is_none());

        let delete =
            build_headers(&RequestOptions::with_method(HttpMethod::Delete), URL, &auth).unwrap();
        assert_eq!(delete[CSRF_HEADER], "tok");
    }

    #[test]
    fn bearer_token_is_attached_to_every_request() {
        let auth = SessionAuth::new();
        auth.set_bearer_token("legacy");
        let headers = build_headers(&RequestOptions::get(), URL, &auth).unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer legacy");
    }

    #[test]
    fn caller_headers_are_kept() {
        let mut options = RequestOptions::get();
        options
            .headers
            .insert("x-trace", HeaderValue::from_static("abc"));
        let headers = build_headers(&options, URL, &SessionAuth::new()).unwrap();
        assert_eq!(headers["x-trace"], "abc");
    }
}
