use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use url::Url;

use super::{json_body, message_of, ApiClient};
use crate::error::ClientError;
use crate::outcome::Outcome;
use crate::session::{SessionRecord, SessionStore};

const INVALID_CREDENTIALS: &str = "invalid credentials";
const WRONG_CREDENTIALS: &str = "Your Password or Username is wrong";
const SIGN_UP_FAILED: &str = "Unable to create your account, please try again";

/// External identity providers whose access tokens the backend can exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityProvider {
    Google,
    Facebook,
}

impl IdentityProvider {
    pub fn name(self) -> &'static str {
        match self {
            IdentityProvider::Google => "google",
            IdentityProvider::Facebook => "facebook",
        }
    }

    fn exchange_path(self) -> &'static str {
        match self {
            IdentityProvider::Google => "google-signin",
            IdentityProvider::Facebook => "facebook-signin",
        }
    }

    fn failure_message(self) -> &'static str {
        match self {
            IdentityProvider::Google => "Google sign-in failed",
            IdentityProvider::Facebook => "Facebook sign-in failed",
        }
    }
}

impl fmt::Display for IdentityProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IdentityProvider {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(IdentityProvider::Google),
            "facebook" => Ok(IdentityProvider::Facebook),
            other => Err(format!(
                "unknown identity provider '{other}' (expected google or facebook)"
            )),
        }
    }
}

/// Fields posted to `/signup/user-info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

impl<S> ApiClient<S>
where
    S: SessionStore + 'static,
{
    /// Email/password sign-in. Persists the session record on success.
    pub async fn submit_credentials(&self, email: &str, password: &str) -> Outcome<Value> {
        match self.sign_in(email, password).await {
            Ok(user) => {
                info!(email, "signed in");
                Ok(user)
            }
            Err(err) => {
                warn!(email, error = %err, "sign-in failed");
                Err(err.into_failure(INVALID_CREDENTIALS))
            }
        }
    }

    /// Create an account. Bounded by the sign-up timeout.
    pub async fn register_account(&self, request: &SignUpRequest) -> Outcome<Value> {
        match self.sign_up(request).await {
            Ok(user) => {
                info!(email = %request.email, "account created");
                Ok(user)
            }
            Err(err) => {
                warn!(email = %request.email, error = %err, "sign-up failed");
                Err(err.into_failure(SIGN_UP_FAILED))
            }
        }
    }

    /// Fetch the provider profile with `access_token`, then trade it for a
    /// backend session. Either step failing yields the provider's generic message.
    pub async fn exchange_identity_token(
        &self,
        provider: IdentityProvider,
        access_token: &str,
    ) -> Outcome<Value> {
        match self.exchange(provider, access_token).await {
            Ok(user) => {
                info!(%provider, "identity token exchanged");
                Ok(user)
            }
            Err(err) => {
                warn!(%provider, error = %err, "identity token exchange failed");
                Err(err.into_generic_failure(provider.failure_message()))
            }
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Value, ClientError> {
        let url = self.endpoint(&["signin"])?;
        let response = self
            .http
            .post(url)
            .json(&Credentials { email, password })
            .send()
            .await?;
        let user = user_from_reply(json_body(response).await?, WRONG_CREDENTIALS)?;
        self.save_session(&user)?;
        Ok(user)
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<Value, ClientError> {
        let url = self.endpoint(&["signup", "user-info"])?;
        let response = self
            .http
            .post(url)
            .timeout(self.config.signup_timeout)
            .json(request)
            .send()
            .await?;
        let user = user_from_reply(json_body(response).await?, SIGN_UP_FAILED)?;
        self.save_session(&user)?;
        Ok(user)
    }

    async fn exchange(
        &self,
        provider: IdentityProvider,
        access_token: &str,
    ) -> Result<Value, ClientError> {
        if access_token.trim().is_empty() {
            return Err(ClientError::Validation(format!(
                "A {provider} access token is required"
            )));
        }

        let response = self
            .http
            .get(self.profile_url(provider).clone())
            .bearer_auth(access_token)
            .send()
            .await?;
        let profile = json_body(response).await?;
        if !profile.is_object() {
            return Err(ClientError::UnexpectedBody(format!(
                "{provider} profile is not an object"
            )));
        }

        let url = self.endpoint(&[provider.exchange_path()])?;
        let response = self
            .http
            .post(url)
            .json(&json!({ "profile": profile }))
            .send()
            .await?;
        let user = user_from_reply(json_body(response).await?, provider.failure_message())?;
        self.save_session(&user)?;
        Ok(user)
    }

    fn profile_url(&self, provider: IdentityProvider) -> &Url {
        match provider {
            IdentityProvider::Google => &self.config.google_profile_url,
            IdentityProvider::Facebook => &self.config.facebook_profile_url,
        }
    }

    fn save_session(&self, user: &Value) -> Result<(), ClientError> {
        SessionRecord::new(user.clone()).persist(self.store.as_ref())?;
        Ok(())
    }
}

/// The user record from an auth reply that marks success; otherwise the
/// server's message (or a stock one) as a rejection.
fn user_from_reply(reply: Value, rejection: &str) -> Result<Value, ClientError> {
    if !marks_success(&reply) {
        return Err(ClientError::Server {
            status: None,
            message: Some(message_of(&reply).unwrap_or_else(|| rejection.to_string())),
        });
    }

    ["user", "data"]
        .iter()
        .filter_map(|key| reply.get(*key))
        .find(|value| !value.is_null())
        .cloned()
        .ok_or_else(|| {
            ClientError::UnexpectedBody("success reply without a user record".to_string())
        })
}

fn marks_success(reply: &Value) -> bool {
    if let Some(flag) = reply.get("success").and_then(Value::as_bool) {
        return flag;
    }
    ["message", "status"].iter().any(|key| {
        reply
            .get(*key)
            .and_then(Value::as_str)
            .is_some_and(|text| text.eq_ignore_ascii_case("success"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_in_reply(reply: Value) -> Result<Value, ClientError> {
        user_from_reply(reply, WRONG_CREDENTIALS)
    }

    #[test]
    fn success_flag_with_user_yields_user() {
        let user = sign_in_reply(json!({ "success": true, "user": { "id": 9 } }))
            .expect("user present");
        assert_eq!(user, json!({ "id": 9 }));
    }

    #[test]
    fn success_message_with_data_yields_user() {
        let user = sign_in_reply(json!({ "message": "success", "data": { "id": 4 } }))
            .expect("user present");
        assert_eq!(user["id"], 4);
    }

    #[test]
    fn explicit_false_flag_wins_over_message() {
        let err = sign_in_reply(json!({
            "success": false,
            "message": "success",
            "user": { "id": 1 }
        }))
        .expect_err("rejected");
        assert!(matches!(
            err,
            ClientError::Server { message: Some(ref text), .. } if text == WRONG_CREDENTIALS
        ));
    }

    #[test]
    fn rejection_carries_server_message() {
        let err = sign_in_reply(json!({
            "success": false,
            "message": "Account is locked"
        }))
        .expect_err("rejected");
        assert_eq!(
            err.into_failure(INVALID_CREDENTIALS).message,
            "Account is locked"
        );
    }

    #[test]
    fn success_without_user_is_unexpected() {
        let err = sign_in_reply(json!({ "success": true, "user": null }))
            .expect_err("no user record");
        assert!(matches!(err, ClientError::UnexpectedBody(_)));
    }

    #[test]
    fn provider_parses_case_insensitively() {
        assert_eq!(
            "Google".parse::<IdentityProvider>(),
            Ok(IdentityProvider::Google)
        );
        assert_eq!(
            " facebook ".parse::<IdentityProvider>(),
            Ok(IdentityProvider::Facebook)
        );
        assert!("apple".parse::<IdentityProvider>().is_err());
    }
}
