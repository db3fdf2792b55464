//! Blocking `Transport` backed by a ureq agent.

use std::io;

use crate::config::Configuration;
use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};

/// Sends requests to `api_base` with the configured bearer token.
///
/// Status codes are never turned into errors; 4xx/5xx come back as
/// `HttpResponse` values so the endpoint can classify them.
pub struct UreqTransport {
    agent: ureq::Agent,
    api_base: String,
    token: Option<String>,
    user_agent: String,
}

impl UreqTransport {
    pub fn new(api_base: &str, token: Option<String>, config: &Configuration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(config.timeout))
            .build()
            .new_agent();

        Self {
            agent,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
            user_agent: config.user_agent.clone(),
        }
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.api_base)
        } else {
            format!("{}/{path}", self.api_base)
        }
    }

    fn headers_for(&self, request: &HttpRequest) -> Vec<(String, String)> {
        let mut defaults = vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("User-Agent".to_string(), self.user_agent.clone()),
        ];
        if let Some(token) = &self.token {
            defaults.push(("Authorization".to_string(), format!("Bearer {token}")));
        }

        // Headers set on the request win over the defaults.
        let mut headers: Vec<(String, String)> = defaults
            .into_iter()
            .filter(|(name, _)| request.header(name).is_none())
            .collect();
        headers.extend(request.headers.iter().cloned());
        headers
    }
}

impl Transport for UreqTransport {
    fn execute(&mut self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = self.url_for(&request.path);
        let headers = self.headers_for(request);

        let result = match request.method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(&url);
                for (name, value) in &headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            HttpMethod::Delete => {
                let mut builder = self.agent.delete(&url);
                for (name, value) in &headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            HttpMethod::Post | HttpMethod::Put => {
                let mut builder = if request.method == HttpMethod::Post {
                    self.agent.post(&url)
                } else {
                    self.agent.put(&url)
                };
                for (name, value) in &headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                match &request.body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        };

        let mut response = result.map_err(map_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(map_body_error)?;

        Ok(HttpResponse { status, headers, body })
    }
}

/// Only failures that can go away on their own are mapped to retryable
/// variants; a bad URL or a TLS misconfiguration fails every attempt.
fn map_error(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Timeout(kind) => TransportError::Timeout(format!("{kind:?}")),
        ureq::Error::Io(e) if e.kind() == io::ErrorKind::TimedOut => TransportError::Timeout(e.to_string()),
        ureq::Error::Io(e) => TransportError::Connection(e.to_string()),
        ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => {
            TransportError::Connection(err.to_string())
        }
        other => TransportError::Request(other.to_string()),
    }
}

/// Errors while reading the body after the status line arrived. A stall or a
/// dropped connection is a transport failure; undecodable bytes are a parse
/// failure.
fn map_body_error(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Io(e) if e.kind() == io::ErrorKind::InvalidData => TransportError::Parse(e.to_string()),
        ureq::Error::Timeout(_) | ureq::Error::Io(_) | ureq::Error::ConnectionFailed => map_error(err),
        other => TransportError::Parse(other.to_string()),
    }
}
