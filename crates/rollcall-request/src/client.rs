//! API client: instance selection and request construction.

use std::sync::{Arc, Mutex, PoisonError};

use reqwest::Url;
use rollcall_core::rng::{DeterministicRng, StdDeterministicRng};
use rollcall_core::transport::{HttpRequest, Transport};
use tracing::debug;

use crate::config::PoolConfig;
use crate::error::RequestError;
use crate::request::CancellableRequest;
use crate::reqwest_transport::ReqwestTransport;
use crate::spec::{RequestBody, RequestSpec};

const CONTENT_TYPE: &str = "Content-Type";
const APPLICATION_JSON: &str = "application/json";

/// Builds [`CancellableRequest`]s against the configured instance pools.
///
/// Selection is uniform and stateless: no health checks, no stickiness, and
/// no failover to another instance inside one call.
#[derive(Clone)]
pub struct ApiClient {
    config: PoolConfig,
    rng: Arc<Mutex<dyn DeterministicRng + Send>>,
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    /// Creates a client from explicit collaborators.
    #[must_use]
    pub fn new(
        config: PoolConfig,
        rng: Arc<Mutex<dyn DeterministicRng + Send>>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            rng,
            transport,
        }
    }

    /// Creates a client with an OS-seeded RNG and the reqwest transport.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::Config` if the HTTP client cannot be built.
    pub fn with_defaults(config: PoolConfig) -> Result<Self, RequestError> {
        Ok(Self::new(
            config,
            Arc::new(Mutex::new(StdDeterministicRng::from_os_rng())),
            Arc::new(ReqwestTransport::try_default()?),
        ))
    }

    /// The pool configuration in use.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Picks an instance for `spec.group` and builds the request handle.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::UnknownGroup` if the group has no pool,
    /// `RequestError::InvalidUrl` if the endpoint does not form a valid URL,
    /// or `RequestError::Body` if the JSON body cannot be serialized.
    pub fn create(&self, spec: RequestSpec) -> Result<CancellableRequest, RequestError> {
        let pool = self
            .config
            .pool(spec.group)
            .ok_or(RequestError::UnknownGroup(spec.group))?;

        // Lock RNG only for the selection itself.
        let base = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            pool.select(&mut *rng).clone()
        };

        let url = build_url(&base, &spec)?;

        let mut headers = spec.headers;
        if spec.is_json
            && !headers
                .iter()
                .any(|(name, _)| name.eq_ignore_ascii_case(CONTENT_TYPE))
        {
            headers.push((CONTENT_TYPE.to_owned(), APPLICATION_JSON.to_owned()));
        }

        let body = match spec.body {
            None => None,
            Some(RequestBody::Raw(bytes)) => Some(bytes),
            Some(RequestBody::Json(value)) => {
                Some(serde_json::to_vec(&value).map_err(|e| RequestError::Body(e.to_string()))?)
            }
        };

        let request = CancellableRequest::new(
            HttpRequest {
                method: spec.method,
                url: url.into(),
                headers,
                body,
                timeout: self.config.timeout(),
            },
            Arc::clone(&self.transport),
        );
        debug!(
            request_id = %request.id(),
            group = %spec.group,
            method = %spec.method,
            url = %request.request().url,
            "request created"
        );
        Ok(request)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Joins the instance base URL and the endpoint path, then appends the
/// query string. Any path on the base URL is kept.
fn build_url(base: &Url, spec: &RequestSpec) -> Result<Url, RequestError> {
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        spec.endpoint.trim_start_matches('/')
    );
    let mut url = Url::parse(&joined).map_err(|e| RequestError::InvalidUrl {
        url: joined.clone(),
        reason: e.to_string(),
    })?;
    if !spec.query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in &spec.query {
            pairs.append_pair(key, &value.to_string());
        }
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use rollcall_core::transport::Method;
    use rollcall_test_support::{MockRng, SequenceRng, StubTransport};
    use serde_json::json;

    use crate::config::{ApiGroup, InstancePool};

    fn pools() -> PoolConfig {
        PoolConfig::new()
            .with_pool(
                ApiGroup::Data,
                InstancePool::new([
                    "https://data-1.example.com/api",
                    "https://data-2.example.com/api/",
                    "https://data-3.example.com",
                ])
                .unwrap(),
            )
            .with_pool(
                ApiGroup::Auth,
                InstancePool::new(["https://auth.example.com"]).unwrap(),
            )
    }

    fn client_with_rng(rng: impl DeterministicRng + Send + 'static) -> ApiClient {
        ApiClient::new(
            pools(),
            Arc::new(Mutex::new(rng)),
            Arc::new(StubTransport::json(200, &json!({ "success": true }))),
        )
    }

    #[test]
    fn test_create_keeps_base_path_and_serializes_query() {
        let client = client_with_rng(MockRng);

        let request = client
            .create(
                RequestSpec::new(ApiGroup::Data, "/attendance/daily")
                    .query("group", "3º B")
                    .query("page", 2),
            )
            .unwrap();

        assert_eq!(
            request.request().url,
            "https://data-1.example.com/api/attendance/daily?group=3%C2%BA+B&page=2"
        );
        assert_eq!(request.request().method, Method::Get);
        assert!(request.request().body.is_none());
    }

    #[test]
    fn test_create_normalizes_slashes_between_base_and_endpoint() {
        let client = client_with_rng(SequenceRng::new(vec![1]));

        let request = client
            .create(RequestSpec::new(ApiGroup::Data, "students"))
            .unwrap();

        assert_eq!(
            request.request().url,
            "https://data-2.example.com/api/students"
        );
    }

    #[test]
    fn test_json_flag_sets_content_type_and_serializes_body() {
        let client = client_with_rng(MockRng);

        let request = client
            .create(
                RequestSpec::new(ApiGroup::Auth, "/login")
                    .method(Method::Post)
                    .json(json!({ "email": "director@school.example" })),
            )
            .unwrap();

        let http = request.request();
        assert_eq!(http.header("content-type"), Some("application/json"));
        let body: serde_json::Value = serde_json::from_slice(http.body.as_ref().unwrap()).unwrap();
        assert_eq!(body["email"], "director@school.example");
    }

    #[test]
    fn test_raw_body_without_json_flag_has_no_content_type() {
        let client = client_with_rng(MockRng);

        let request = client
            .create(
                RequestSpec::new(ApiGroup::Data, "/upload")
                    .method(Method::Put)
                    .raw(b"photo-bytes".to_vec()),
            )
            .unwrap();

        assert_eq!(request.request().header("content-type"), None);
        assert_eq!(request.request().body.as_deref(), Some(&b"photo-bytes"[..]));
    }

    #[test]
    fn test_explicit_content_type_is_not_duplicated() {
        let client = client_with_rng(MockRng);

        let mut spec = RequestSpec::new(ApiGroup::Data, "/notes")
            .method(Method::Post)
            .header("content-type", "application/merge-patch+json");
        spec.is_json = true;
        let request = client.create(spec).unwrap();

        let content_types: Vec<_> = request
            .request()
            .headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .collect();
        assert_eq!(content_types.len(), 1);
    }

    #[test]
    fn test_unconfigured_group_is_a_programmer_error() {
        let client = ApiClient::new(
            PoolConfig::new().with_pool(
                ApiGroup::Data,
                InstancePool::new(["https://data-1.example.com"]).unwrap(),
            ),
            Arc::new(Mutex::new(MockRng)),
            Arc::new(StubTransport::json(200, &json!({}))),
        );

        let result = client.create(RequestSpec::new(ApiGroup::Auth, "/login"));

        assert_eq!(result.unwrap_err(), RequestError::UnknownGroup(ApiGroup::Auth));
    }

    #[test]
    fn test_selection_stays_in_pool_and_is_roughly_uniform() {
        let client = client_with_rng(StdDeterministicRng::seeded(2025));
        let configured: Vec<String> = client
            .config()
            .pool(ApiGroup::Data)
            .unwrap()
            .urls()
            .iter()
            .map(|u| u.as_str().trim_end_matches('/').to_owned())
            .collect();

        let mut counts: HashMap<String, usize> = HashMap::new();
        for _ in 0..1000 {
            let request = client.create(RequestSpec::new(ApiGroup::Data, "/ping")).unwrap();
            let url = request.request().url.clone();
            let base = url.strip_suffix("/ping").unwrap().to_owned();
            assert!(configured.contains(&base), "out-of-pool selection: {base}");
            *counts.entry(base).or_default() += 1;
        }

        assert_eq!(counts.len(), 3);
        for (base, count) in counts {
            assert!(
                (250..=420).contains(&count),
                "{base} selected {count} times out of 1000"
            );
        }
    }
}
