use std::collections::HashMap;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{AuthError, IdTokenClaims, Session, SessionProvider, StoredTokens, TokenStore};
use crate::config::IdentityConfig;

const TARGET_PREFIX: &str = "AWSCognitoIdentityProviderService";
const AMZ_JSON: &str = "application/x-amz-json-1.1";

/// Refresh the identity token when it expires within this window.
const REFRESH_SKEW_SECS: i64 = 60;

/// Cognito user-pool client: signs in, keeps the ID token fresh and signs out.
///
/// Only the public-client flows are supported (no client secret, no SRP);
/// any challenge the pool answers with is reported as
/// [`AuthError::ChallengeRequired`].
pub struct CognitoSessionProvider {
    endpoint: String,
    client_id: String,
    client: reqwest::blocking::Client,
    store: TokenStore,
    tokens: Mutex<Option<StoredTokens>>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthRequest<'a> {
    auth_flow: &'a str,
    client_id: &'a str,
    auth_parameters: HashMap<&'static str, &'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthResponse {
    authentication_result: Option<AuthenticationResult>,
    challenge_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    id_token: String,
    access_token: String,
    refresh_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct GlobalSignOutRequest<'a> {
    access_token: &'a str,
}

/// Error body returned by the identity provider on non-2xx responses.
#[derive(Deserialize, Default)]
struct ProviderErrorBody {
    #[serde(rename = "__type")]
    kind: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
}

#[derive(Deserialize)]
struct Empty {}

impl CognitoSessionProvider {
    /// Create a provider, restoring any tokens persisted in `store`.
    pub fn new(
        identity: &IdentityConfig,
        store: TokenStore,
        timeout_secs: u64,
    ) -> Result<Self, AuthError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let tokens = store.load()?;
        Ok(Self {
            endpoint: identity.endpoint_url(),
            client_id: identity.client_id.clone(),
            client,
            store,
            tokens: Mutex::new(tokens),
        })
    }

    /// Sign in with username and password (`USER_PASSWORD_AUTH`).
    pub fn sign_in(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let mut params = HashMap::new();
        params.insert("USERNAME", username);
        params.insert("PASSWORD", password);

        let response: InitiateAuthResponse = self.call(
            "InitiateAuth",
            &InitiateAuthRequest {
                auth_flow: "USER_PASSWORD_AUTH",
                client_id: &self.client_id,
                auth_parameters: params,
            },
        )?;

        let tokens = Self::tokens_from(response, None)?;
        let session = session_from(&tokens)?;
        self.store.save(&tokens)?;
        *self.tokens.lock().map_err(|_| AuthError::LockPoisoned)? = Some(tokens);

        tracing::info!(email = %session.email, "Signed in");
        Ok(session)
    }

    fn refresh(&self, refresh_token: &str) -> Result<StoredTokens, AuthError> {
        let mut params = HashMap::new();
        params.insert("REFRESH_TOKEN", refresh_token);

        let response: InitiateAuthResponse = self.call(
            "InitiateAuth",
            &InitiateAuthRequest {
                auth_flow: "REFRESH_TOKEN_AUTH",
                client_id: &self.client_id,
                auth_parameters: params,
            },
        )?;

        Self::tokens_from(response, Some(refresh_token))
    }

    /// Turn an InitiateAuth response into tokens. Refresh responses carry no
    /// new refresh token, so the one used for the call is kept.
    fn tokens_from(
        response: InitiateAuthResponse,
        previous_refresh: Option<&str>,
    ) -> Result<StoredTokens, AuthError> {
        if let Some(challenge) = response.challenge_name {
            return Err(AuthError::ChallengeRequired(challenge));
        }
        let result = response.authentication_result.ok_or_else(|| {
            AuthError::Rejected {
                code: "MissingAuthenticationResult".into(),
                message: "identity provider returned no tokens".into(),
            }
        })?;

        Ok(StoredTokens {
            id_token: result.id_token,
            access_token: result.access_token,
            refresh_token: result
                .refresh_token
                .or_else(|| previous_refresh.map(str::to_string)),
        })
    }

    fn call<B: Serialize, R: DeserializeOwned>(
        &self,
        action: &str,
        body: &B,
    ) -> Result<R, AuthError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Amz-Target", format!("{TARGET_PREFIX}.{action}"))
            .header(reqwest::header::CONTENT_TYPE, AMZ_JSON)
            .json(body)
            .send()
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !status.is_success() {
            let parsed: ProviderErrorBody = serde_json::from_str(&text).unwrap_or_default();
            let code = parsed
                .kind
                .map(|k| k.rsplit('#').next().unwrap_or_default().to_string())
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(AuthError::Rejected {
                code,
                message: parsed.message.unwrap_or(text),
            });
        }

        serde_json::from_str(&text).map_err(|e| AuthError::Rejected {
            code: "MalformedResponse".into(),
            message: e.to_string(),
        })
    }

    fn forget_tokens(&self, slot: &mut Option<StoredTokens>) -> Result<(), AuthError> {
        *slot = None;
        self.store.clear()
    }
}

fn session_from(tokens: &StoredTokens) -> Result<Session, AuthError> {
    let claims = IdTokenClaims::decode(&tokens.id_token)?;
    let email = claims.email.ok_or(AuthError::MissingIdentity)?;
    Ok(Session {
        id_token: tokens.id_token.clone(),
        email,
    })
}

impl SessionProvider for CognitoSessionProvider {
    fn current_session(&self) -> Result<Session, AuthError> {
        let mut slot = self.tokens.lock().map_err(|_| AuthError::LockPoisoned)?;
        let tokens = slot.as_ref().ok_or(AuthError::NoSession)?;

        let claims = IdTokenClaims::decode(&tokens.id_token)?;
        if claims.is_fresh(chrono::Utc::now(), REFRESH_SKEW_SECS) {
            return session_from(tokens);
        }

        let Some(refresh_token) = tokens.refresh_token.clone() else {
            tracing::info!("Identity token expired and no refresh token is stored");
            self.forget_tokens(&mut slot)?;
            return Err(AuthError::NoSession);
        };

        tracing::debug!("Refreshing identity token");
        match self.refresh(&refresh_token) {
            Ok(fresh) => {
                let session = session_from(&fresh)?;
                self.store.save(&fresh)?;
                *slot = Some(fresh);
                Ok(session)
            }
            Err(e @ AuthError::Rejected { .. }) => {
                tracing::warn!(error = %e, "Token refresh rejected; session cleared");
                self.forget_tokens(&mut slot)?;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    fn sign_out(&self) -> Result<(), AuthError> {
        let mut slot = self.tokens.lock().map_err(|_| AuthError::LockPoisoned)?;
        if let Some(tokens) = slot.as_ref() {
            let result: Result<Empty, AuthError> = self.call(
                "GlobalSignOut",
                &GlobalSignOutRequest {
                    access_token: &tokens.access_token,
                },
            );
            if let Err(e) = result {
                tracing::warn!(error = %e, "Global sign-out failed; clearing local session anyway");
            }
        }
        self.forget_tokens(&mut slot)?;
        tracing::info!("Signed out");
        Ok(())
    }
}
