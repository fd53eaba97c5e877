//! Session Provider: the managed identity service that issues the bearer
//! token sent with every Record Service call and names the lab.
//!
//! The dashboard only needs two things from it: the current token plus the
//! signed-in user's email (the lab partition key), and a way to sign out.

pub mod claims;
pub mod cognito;
pub mod store;

pub use claims::*;
pub use cognito::*;
pub use store::*;

use std::sync::Mutex;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("No active session; sign in first")]
    NoSession,

    #[error("Signed-in identity has no email attribute")]
    MissingIdentity,

    #[error("Identity provider requires the {0} challenge, which is not supported here")]
    ChallengeRequired(String),

    #[error("Identity provider rejected the request ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("Identity provider unreachable: {0}")]
    Transport(String),

    #[error("Malformed identity token: {0}")]
    MalformedToken(String),

    #[error("Session store error: {0}")]
    Store(String),

    #[error("Internal lock error")]
    LockPoisoned,
}

/// An authenticated session: the raw identity token and the user's email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id_token: String,
    pub email: String,
}

impl Session {
    /// The lab partition key for every list/mutate call.
    pub fn lab_id(&self) -> &str {
        &self.email
    }
}

/// Source of the current session. Implementations may refresh tokens.
pub trait SessionProvider {
    fn current_session(&self) -> Result<Session, AuthError>;

    fn sign_out(&self) -> Result<(), AuthError>;
}

impl<P: SessionProvider + ?Sized> SessionProvider for Box<P> {
    fn current_session(&self) -> Result<Session, AuthError> {
        (**self).current_session()
    }

    fn sign_out(&self) -> Result<(), AuthError> {
        (**self).sign_out()
    }
}

/// Session provider with a fixed token, for tests and pre-issued tokens.
pub struct StaticSessionProvider {
    session: Mutex<Option<Session>>,
}

impl StaticSessionProvider {
    pub fn new(id_token: &str, email: &str) -> Self {
        Self {
            session: Mutex::new(Some(Session {
                id_token: id_token.to_string(),
                email: email.to_string(),
            })),
        }
    }

    /// A provider with no session: every `current_session` fails.
    pub fn signed_out() -> Self {
        Self {
            session: Mutex::new(None),
        }
    }

    /// Build from an identity token alone, reading the email from its claims.
    pub fn from_id_token(id_token: &str) -> Result<Self, AuthError> {
        let claims = IdTokenClaims::decode(id_token)?;
        let email = claims.email.ok_or(AuthError::MissingIdentity)?;
        Ok(Self::new(id_token, &email))
    }
}

impl SessionProvider for StaticSessionProvider {
    fn current_session(&self) -> Result<Session, AuthError> {
        self.session
            .lock()
            .map_err(|_| AuthError::LockPoisoned)?
            .clone()
            .ok_or(AuthError::NoSession)
    }

    fn sign_out(&self) -> Result<(), AuthError> {
        *self.session.lock().map_err(|_| AuthError::LockPoisoned)? = None;
        tracing::info!("Signed out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_provider_returns_session() {
        let provider = StaticSessionProvider::new("tok", "lab@example.com");
        let session = provider.current_session().unwrap();
        assert_eq!(session.id_token, "tok");
        assert_eq!(session.lab_id(), "lab@example.com");
    }

    #[test]
    fn signed_out_provider_fails() {
        let provider = StaticSessionProvider::signed_out();
        assert!(matches!(
            provider.current_session(),
            Err(AuthError::NoSession)
        ));
    }

    #[test]
    fn sign_out_drops_session() {
        let provider = StaticSessionProvider::new("tok", "lab@example.com");
        provider.sign_out().unwrap();
        assert!(matches!(
            provider.current_session(),
            Err(AuthError::NoSession)
        ));
    }

    #[test]
    fn from_id_token_reads_email() {
        let token = claims::tests::fake_jwt(r#"{"email":"lab@example.com","exp":4102444800}"#);
        let provider = StaticSessionProvider::from_id_token(&token).unwrap();
        assert_eq!(provider.current_session().unwrap().email, "lab@example.com");
    }

    #[test]
    fn from_id_token_without_email_fails() {
        let token = claims::tests::fake_jwt(r#"{"exp":4102444800}"#);
        assert!(matches!(
            StaticSessionProvider::from_id_token(&token),
            Err(AuthError::MissingIdentity)
        ));
    }
}
