//! The `Endpoint` base: one remote record plus the machinery to talk to it.
//!
//! # Design
//! An `Endpoint` owns its attribute bag, the id of the record it mirrors,
//! and a transport built on first use. Every network operation funnels
//! through `request_with`, which dispatches with bounded retries and then
//! classifies the response:
//!
//! - 200..=310: merge the body into the bag, then require
//!   `meta.status == "success"`.
//! - 404: `EndpointError::NotFound`.
//! - anything else: `EndpointError::UnexpectedStatus`.
//!
//! Calls block the current thread for the whole exchange including retries.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::attributes::{AttributeBag, ResourceId};
use crate::config::{default_configuration, Configuration};
use crate::error::{EndpointError, TransportError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::resource::ResourceConfig;
use crate::retry::RetryPolicy;
use crate::transport::UreqTransport;

const SUCCESS_STATUSES: std::ops::RangeInclusive<u16> = 200..=310;

/// A client-side proxy for one remote record.
pub struct Endpoint {
    attributes: AttributeBag,
    id: Option<ResourceId>,
    token: Option<String>,
    config: Arc<Configuration>,
    api_base: String,
    resource: ResourceConfig,
    retry: RetryPolicy,
    transport: Option<Box<dyn Transport>>,
}

impl Endpoint {
    /// Create an empty endpoint using the process-wide configuration.
    pub fn new(resource: ResourceConfig) -> Result<Self, EndpointError> {
        Ok(Self::with_config(resource, default_configuration()?))
    }

    pub fn with_config(resource: ResourceConfig, config: Arc<Configuration>) -> Self {
        Self {
            attributes: AttributeBag::new(),
            id: None,
            token: config.access_token.clone(),
            api_base: config.api_base(),
            config,
            resource,
            retry: RetryPolicy::default(),
            transport: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<ResourceId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Override the bearer token for this instance. Drops any transport
    /// already built with the previous token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self.transport = None;
        self
    }

    pub fn with_transport(mut self, transport: Box<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_attributes(mut self, attributes: AttributeBag) -> Self {
        self.attributes = attributes;
        self
    }

    /// Construct an endpoint seeded with `id` and load it with a GET to
    /// `{endpoint_path}/{id}`.
    pub fn find(
        resource: ResourceConfig,
        id: impl Into<ResourceId>,
        params: &[(&str, &str)],
    ) -> Result<Self, EndpointError> {
        let mut endpoint = Endpoint::new(resource)?.with_id(id);
        endpoint.fetch(params)?;
        Ok(endpoint)
    }

    /// Listing is not provided by the base endpoint.
    pub fn all(
        _resource: ResourceConfig,
        _limit: u32,
        _offset: u32,
    ) -> Result<Vec<Self>, EndpointError> {
        Err(EndpointError::NotImplemented("all"))
    }

    pub fn id(&self) -> Option<&ResourceId> {
        self.id.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn config(&self) -> &Arc<Configuration> {
        &self.config
    }

    pub fn resource(&self) -> &ResourceConfig {
        &self.resource
    }

    pub fn attributes(&self) -> &AttributeBag {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut AttributeBag {
        &mut self.attributes
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.attributes.set(key, value)
    }

    /// GET `{endpoint_path}/{id}` with `params` as the query string.
    pub fn fetch(&mut self, params: &[(&str, &str)]) -> Result<&mut Self, EndpointError> {
        let id = self
            .id
            .clone()
            .ok_or_else(|| EndpointError::Configuration("cannot fetch a record without an id".to_string()))?;
        let path = self.resource.member_path(&id)?;
        let path = with_query(path, params);
        self.request(HttpMethod::Get, &path)
    }

    /// Create the record with a POST when it has no id yet, otherwise update
    /// it with a PUT to `{endpoint_path}/{id}`.
    pub fn save(&mut self) -> Result<&mut Self, EndpointError> {
        let (method, path) = match &self.id {
            None => (HttpMethod::Post, self.resource.collection_path()?),
            Some(id) => (HttpMethod::Put, self.resource.member_path(id)?),
        };
        let body = serde_json::to_string(&self.envelope())
            .map_err(|e| EndpointError::Serialization(e.to_string()))?;

        self.request_with(method, &path, move |request| {
            request
                .headers
                .push(("Content-Type".to_string(), "application/json".to_string()));
            request.body = Some(body);
        })
    }

    pub fn request(&mut self, method: HttpMethod, path: &str) -> Result<&mut Self, EndpointError> {
        self.request_with(method, path, |_| {})
    }

    /// Issue a request, letting `customize` adjust it before dispatch, and
    /// merge a successful response into this endpoint.
    pub fn request_with<F>(
        &mut self,
        method: HttpMethod,
        path: &str,
        customize: F,
    ) -> Result<&mut Self, EndpointError>
    where
        F: FnOnce(&mut HttpRequest),
    {
        let mut request = HttpRequest::new(method, path);
        customize(&mut request);

        let (response, attempts) = self.dispatch(&request)?;
        self.apply_response(&request, response, attempts)
    }

    /// The write envelope: each api key at the top level, every other
    /// attribute under `data`.
    pub fn envelope(&self) -> Value {
        let api_keys = self.resource.api_key_list();
        let singular = self.resource.singular();

        let mut envelope = Map::new();
        for key in api_keys {
            let value = self.attributes.get(key).cloned().unwrap_or(Value::Null);
            envelope.insert(key.clone(), value);
        }

        let data: Map<String, Value> = self
            .attributes
            .iter()
            .filter(|(key, _)| {
                !api_keys.iter().any(|k| k.as_str() == *key)
                    && singular.as_deref() != Some(*key)
                    && *key != "meta"
                    && *key != "id"
            })
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect();
        envelope.insert("data".to_string(), Value::Object(data));

        Value::Object(envelope)
    }

    fn transport(&mut self) -> &mut dyn Transport {
        let api_base = &self.api_base;
        let token = &self.token;
        let config = &self.config;
        &mut **self
            .transport
            .get_or_insert_with(|| {
                Box::new(UreqTransport::new(api_base, token.clone(), config)) as Box<dyn Transport>
            })
    }

    /// Run `request` through the transport, retrying transient failures.
    /// Returns the response with the number of attempts it took.
    fn dispatch(&mut self, request: &HttpRequest) -> Result<(HttpResponse, u32), EndpointError> {
        let policy = self.retry;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.transport().execute(request) {
                Ok(response) => return Ok((response, attempt)),
                Err(err) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = policy.max_attempts,
                        method = request.method.as_str(),
                        path = %request.path,
                        error = %err,
                        "API request failed"
                    );
                    if !policy.should_retry(&err, attempt) {
                        return Err(EndpointError::Transport {
                            attempts: attempt,
                            source: err,
                        });
                    }
                }
            }
        }
    }

    fn apply_response(
        &mut self,
        request: &HttpRequest,
        response: HttpResponse,
        attempts: u32,
    ) -> Result<&mut Self, EndpointError> {
        if response.status == 404 {
            return Err(EndpointError::NotFound);
        }
        if !SUCCESS_STATUSES.contains(&response.status) {
            return Err(EndpointError::UnexpectedStatus {
                status: response.status,
                body: response.body,
            });
        }

        let body = match parse_body(&response.body) {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(
                    attempt = attempts,
                    method = request.method.as_str(),
                    path = %request.path,
                    error = %err,
                    "API response could not be parsed"
                );
                return Err(EndpointError::Transport { attempts, source: err });
            }
        };

        self.attributes.merge(body);
        if self.id.is_none() {
            self.id = self.attributes.id();
        }

        match self.attributes.meta() {
            Some(meta) if meta.is_success() => {
                tracing::debug!(
                    status = response.status,
                    method = request.method.as_str(),
                    path = %request.path,
                    "API request succeeded"
                );
                Ok(self)
            }
            meta => Err(EndpointError::Application {
                message: meta.and_then(|m| m.message),
            }),
        }
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("id", &self.id)
            .field("api_base", &self.api_base)
            .field("resource", &self.resource)
            .field("attributes", &self.attributes)
            .field("has_token", &self.token.is_some())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

fn parse_body(body: &str) -> Result<Map<String, Value>, TransportError> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(TransportError::Parse(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(TransportError::Parse(e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn with_query(path: String, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return path;
    }
    let query: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect();
    format!("{path}?{}", query.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn endpoint(resource: ResourceConfig) -> Endpoint {
        Endpoint::with_config(
            resource,
            Arc::new(Configuration::new("http://localhost:3000/").access_token("token-1")),
        )
    }

    fn classrooms() -> ResourceConfig {
        ResourceConfig::new()
            .endpoint_name("classrooms")
            .api_keys(["access_token", "session_id"])
    }

    #[test]
    fn api_base_and_token_come_from_configuration() {
        let e = endpoint(classrooms());
        assert_eq!(e.api_base(), "http://localhost:3000/api/v1");
        assert_eq!(e.token(), Some("token-1"));
        assert!(e.id().is_none());
        assert!(e.attributes().is_empty());
    }

    #[test]
    fn with_token_overrides_configuration() {
        let e = endpoint(classrooms()).with_token("other");
        assert_eq!(e.token(), Some("other"));
    }

    #[test]
    fn envelope_splits_api_keys_from_data() {
        let mut e = endpoint(classrooms());
        e.set("access_token", "abc");
        e.set("name", "Period 1");
        e.set("grade", 5);
        e.set("id", 9);
        e.set("meta", json!({"status": "success"}));
        e.set("classroom", json!({"name": "echoed"}));

        assert_eq!(
            e.envelope(),
            json!({
                "access_token": "abc",
                "session_id": null,
                "data": {"name": "Period 1", "grade": 5}
            })
        );
    }

    #[test]
    fn envelope_without_api_keys_is_all_data() {
        let mut e = endpoint(ResourceConfig::new().endpoint_name("students"));
        e.set("first_name", "Ada");
        assert_eq!(e.envelope(), json!({"data": {"first_name": "Ada"}}));
    }

    #[test]
    fn envelope_keeps_nested_values_structured() {
        let mut e = endpoint(ResourceConfig::new().endpoint_name("students"));
        e.set("tags", json!(["a", "b"]));
        e.set("guardian", json!({"name": "Grace", "phone": null}));
        e.set("grade", 5);

        let envelope = e.envelope();
        assert_eq!(envelope["data"]["tags"], json!(["a", "b"]));
        assert_eq!(envelope["data"]["guardian"]["name"], "Grace");
        assert_eq!(envelope["data"]["grade"], 5);

        let wire: Value = serde_json::from_str(&envelope.to_string()).unwrap();
        assert!(wire["data"]["guardian"].is_object());
    }

    #[test]
    fn query_string_is_encoded() {
        assert_eq!(with_query("classrooms/1".to_string(), &[]), "classrooms/1");
        assert_eq!(
            with_query("classrooms/1".to_string(), &[("include", "students"), ("q", "a b&c")]),
            "classrooms/1?include=students&q=a%20b%26c"
        );
    }

    #[test]
    fn parse_body_rejects_non_objects() {
        assert!(parse_body(r#"{"meta":{}}"#).is_ok());
        assert!(matches!(parse_body("[]"), Err(TransportError::Parse(_))));
        assert!(matches!(parse_body(""), Err(TransportError::Parse(_))));
        assert!(matches!(parse_body("<html>"), Err(TransportError::Parse(_))));
    }

    #[test]
    fn fetch_without_id_is_a_configuration_error() {
        let mut e = endpoint(classrooms());
        assert!(matches!(e.fetch(&[]), Err(EndpointError::Configuration(_))));
    }

    #[test]
    fn save_without_endpoint_path_is_a_configuration_error() {
        let mut e = endpoint(ResourceConfig::new());
        assert!(matches!(e.save(), Err(EndpointError::Configuration(_))));
    }

    #[test]
    fn all_is_not_implemented() {
        let err = Endpoint::all(classrooms(), 25, 0).unwrap_err();
        assert!(matches!(err, EndpointError::NotImplemented("all")));
    }
}
