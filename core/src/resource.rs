//! Per-resource-type metadata and the `Resource` trait.
//!
//! # Design
//! Each resource type describes itself with a `ResourceConfig`: the
//! collection path, the attribute keys sent at the top level of a write
//! envelope, and the resource's own singular key. A derived type starts from
//! its parent's config with `ResourceConfig::inherit` and overrides what it
//! needs; the parent is never affected.

use serde_json::Value;

use crate::attributes::ResourceId;
use crate::endpoint::Endpoint;
use crate::error::EndpointError;

pub const DEFAULT_PAGE_LIMIT: u32 = 25;

/// Type-level metadata shared by every instance of a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceConfig {
    endpoint_path: Option<String>,
    api_keys: Vec<String>,
    singular_name: Option<String>,
}

impl ResourceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a derived type's config from its parent's.
    pub fn inherit(parent: &ResourceConfig) -> Self {
        parent.clone()
    }

    /// Set the collection path, e.g. `"classrooms"`.
    pub fn endpoint_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.endpoint_path = Some(name.trim_end_matches('/').to_string());
        self
    }

    /// Set the keys sent at the top level of a write envelope.
    pub fn api_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.api_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn singular_name(mut self, name: impl Into<String>) -> Self {
        self.singular_name = Some(name.into());
        self
    }

    pub fn endpoint_path(&self) -> Option<&str> {
        self.endpoint_path.as_deref()
    }

    pub fn api_key_list(&self) -> &[String] {
        &self.api_keys
    }

    /// The resource's own key in response bodies. Falls back to the last
    /// segment of the endpoint path with one trailing `s` dropped.
    pub fn singular(&self) -> Option<String> {
        if let Some(name) = &self.singular_name {
            return Some(name.clone());
        }
        let path = self.endpoint_path.as_deref()?;
        let last = path.rsplit('/').next().unwrap_or(path);
        if last.is_empty() {
            return None;
        }
        Some(last.strip_suffix('s').unwrap_or(last).to_string())
    }

    pub fn collection_path(&self) -> Result<String, EndpointError> {
        self.endpoint_path
            .clone()
            .ok_or_else(|| EndpointError::Configuration("endpoint_path is not set".to_string()))
    }

    pub fn member_path(&self, id: &ResourceId) -> Result<String, EndpointError> {
        Ok(format!("{}/{id}", self.collection_path()?))
    }
}

/// A concrete remote resource built on an `Endpoint`.
///
/// Implementors supply their config and a wrapper around `Endpoint`; the
/// provided methods give them `new`/`find`/`save`. `all` is left to types
/// whose API supports listing.
pub trait Resource: Sized {
    fn resource_config() -> ResourceConfig;

    fn from_endpoint(endpoint: Endpoint) -> Self;

    fn endpoint(&self) -> &Endpoint;

    fn endpoint_mut(&mut self) -> &mut Endpoint;

    /// Build the endpoint new instances start from. Uses the process-wide
    /// configuration unless overridden.
    fn build_endpoint() -> Result<Endpoint, EndpointError> {
        Endpoint::new(Self::resource_config())
    }

    fn new() -> Result<Self, EndpointError> {
        Ok(Self::from_endpoint(Self::build_endpoint()?))
    }

    fn find(id: impl Into<ResourceId>, params: &[(&str, &str)]) -> Result<Self, EndpointError> {
        let mut endpoint = Self::build_endpoint()?.with_id(id);
        endpoint.fetch(params)?;
        Ok(Self::from_endpoint(endpoint))
    }

    fn all(_limit: u32, _offset: u32) -> Result<Vec<Self>, EndpointError> {
        Err(EndpointError::NotImplemented("all"))
    }

    fn save(&mut self) -> Result<(), EndpointError> {
        self.endpoint_mut().save().map(|_| ())
    }

    fn id(&self) -> Option<&ResourceId> {
        self.endpoint().id()
    }

    fn get(&self, key: &str) -> Option<&Value> {
        self.endpoint().get(key)
    }

    fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.endpoint_mut().set(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_require_endpoint_name() {
        let config = ResourceConfig::new();
        assert!(matches!(
            config.collection_path(),
            Err(EndpointError::Configuration(_))
        ));

        let config = config.endpoint_name("classrooms/");
        assert_eq!(config.collection_path().unwrap(), "classrooms");
        assert_eq!(
            config.member_path(&ResourceId::from(7u64)).unwrap(),
            "classrooms/7"
        );
    }

    #[test]
    fn inherited_config_copies_parent_fields() {
        let parent = ResourceConfig::new()
            .endpoint_name("activities")
            .api_keys(["access_token", "session_id"]);

        let child = ResourceConfig::inherit(&parent);
        assert_eq!(child.endpoint_path(), Some("activities"));
        assert_eq!(child.api_key_list(), ["access_token", "session_id"]);
    }

    #[test]
    fn child_override_leaves_parent_untouched() {
        let parent = ResourceConfig::new()
            .endpoint_name("activities")
            .api_keys(["access_token"]);

        let child = ResourceConfig::inherit(&parent).endpoint_name("activity_sessions");
        let grandchild = ResourceConfig::inherit(&child);

        assert_eq!(parent.endpoint_path(), Some("activities"));
        assert_eq!(child.endpoint_path(), Some("activity_sessions"));
        assert_eq!(grandchild.endpoint_path(), Some("activity_sessions"));
        assert_eq!(grandchild.api_key_list(), ["access_token"]);
    }

    #[test]
    fn singular_name_is_derived_from_path() {
        let config = ResourceConfig::new().endpoint_name("classrooms");
        assert_eq!(config.singular().as_deref(), Some("classroom"));

        let config = ResourceConfig::new().endpoint_name("admin/staff");
        assert_eq!(config.singular().as_deref(), Some("staff"));

        let config = config.singular_name("staff_member");
        assert_eq!(config.singular().as_deref(), Some("staff_member"));

        assert_eq!(ResourceConfig::new().singular(), None);
    }
}
