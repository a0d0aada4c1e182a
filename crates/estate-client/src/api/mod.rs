//! Outbound REST calls.
//!
//! Each public operation issues one logical call and resolves to an
//! [`Outcome`](crate::outcome::Outcome). Nothing is retried; transport errors,
//! HTTP error statuses and malformed bodies all fold into the same failure shape.

mod auth;
mod listing;
mod verification;

pub use auth::{IdentityProvider, SignUpRequest};

use std::sync::Arc;

use reqwest::Response;
use serde_json::Value;
use url::Url;

use crate::config::ApiConfig;
use crate::error::ClientError;
use crate::session::{SessionRecord, SessionStore, StoreError, SESSION_KEY};

/// REST client bound to one backend and one session store.
#[derive(Debug)]
pub struct ApiClient<S> {
    http: reqwest::Client,
    config: ApiConfig,
    store: Arc<S>,
}

impl<S> ApiClient<S>
where
    S: SessionStore + 'static,
{
    pub fn new(config: ApiConfig, store: Arc<S>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_http(http, config, store))
    }

    pub fn with_http(http: reqwest::Client, config: ApiConfig, store: Arc<S>) -> Self {
        Self {
            http,
            config,
            store,
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The session record saved by the last successful auth call, if any.
    pub fn current_session(&self) -> Result<Option<SessionRecord>, StoreError> {
        SessionRecord::load(self.store.as_ref())
    }

    pub fn sign_out(&self) -> Result<(), StoreError> {
        self.store.remove(SESSION_KEY)?;
        tracing::info!("session cleared");
        Ok(())
    }

    /// `base_url` with `segments` appended, each percent-encoded.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Endpoint(self.config.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments.iter().filter(|segment| !segment.is_empty()));
        Ok(url)
    }
}

/// Body of a successful response as JSON (`Null` when empty); error statuses
/// become [`ClientError::Server`] with whatever message the body offers.
pub(crate) async fn json_body(response: Response) -> Result<Value, ClientError> {
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(ClientError::Server {
            status: Some(status),
            message: message_in(&text),
        });
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text)?)
}

pub(crate) fn message_in(text: &str) -> Option<String> {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|value| message_of(&value))
}

/// Human-readable message from a response body. The bare status words some
/// endpoints put in `message` are not messages.
pub(crate) fn message_of(value: &Value) -> Option<String> {
    ["message", "error"]
        .iter()
        .filter_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|text| {
            !text.is_empty()
                && !text.eq_ignore_ascii_case("error")
                && !text.eq_ignore_ascii_case("success")
        })
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::InMemorySessionStore;
    use serde_json::json;

    fn client(base: &str) -> ApiClient<InMemorySessionStore> {
        let config = ApiConfig::for_base_url(Url::parse(base).expect("valid url"));
        ApiClient::new(config, Arc::new(InMemorySessionStore::default())).expect("client builds")
    }

    #[test]
    fn endpoint_appends_and_encodes_segments() {
        let api = client("http://127.0.0.1:8080");
        assert_eq!(
            api.endpoint(&["delete-post", "a b/c"]).expect("url").as_str(),
            "http://127.0.0.1:8080/delete-post/a%20b%2Fc"
        );
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let api = client("https://api.example.com/v2/");
        assert_eq!(
            api.endpoint(&["signup", "user-info"]).expect("url").as_str(),
            "https://api.example.com/v2/signup/user-info"
        );
    }

    #[test]
    fn message_of_skips_status_words() {
        assert_eq!(
            message_of(&json!({ "message": "error", "error": "Email already used" })),
            Some("Email already used".to_string())
        );
        assert_eq!(message_of(&json!({ "message": "success" })), None);
        assert_eq!(message_of(&json!({ "detail": "nope" })), None);
    }

    #[test]
    fn sign_out_removes_the_session_record() {
        let api = client("http://127.0.0.1:8080");
        SessionRecord::new(json!({ "id": 3 }))
            .persist(api.store().as_ref())
            .expect("seed session");
        assert!(api.current_session().expect("read").is_some());

        api.sign_out().expect("sign out");
        assert!(api.current_session().expect("read").is_none());
    }
}
