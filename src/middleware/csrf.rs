//! CSRF protection for every state-changing form.
//!
//! One token is issued per session and stored in the session cookie. Forms
//! carry it in a hidden `csrf_token` field:
//!
//! ```html,ignore
//! <input type="hidden" name="csrf_token" value="{{ client.get_csrf_token() }}">
//! ```
//!
//! POST handlers call [`validate_csrf_token`] before touching the database.

use actix_session::Session;
use actix_web::{error, Error};
use rand::{distributions::Alphanumeric, Rng};

pub const CSRF_TOKEN_LENGTH: usize = 32;
const CSRF_SESSION_KEY: &str = "csrf_token";

pub fn generate_csrf_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CSRF_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Returns the session's token, issuing one on first use.
pub fn get_or_create_csrf_token(session: &Session) -> Result<String, Error> {
    match session.get::<String>(CSRF_SESSION_KEY) {
        Ok(Some(token)) => Ok(token),
        _ => {
            let token = generate_csrf_token();
            session
                .insert(CSRF_SESSION_KEY, token.clone())
                .map_err(|_| error::ErrorInternalServerError("Failed to store CSRF token"))?;
            Ok(token)
        }
    }
}

/// Rejects the request with 403 unless `provided_token` matches the session.
pub fn validate_csrf_token(session: &Session, provided_token: &str) -> Result<(), Error> {
    let expected_token = session
        .get::<String>(CSRF_SESSION_KEY)
        .map_err(|_| error::ErrorInternalServerError("Failed to get CSRF token"))?
        .ok_or_else(|| error::ErrorForbidden("CSRF token not found in session"))?;

    if provided_token.is_empty() || provided_token != expected_token {
        log::warn!("CSRF token validation failed");
        return Err(error::ErrorForbidden("Invalid CSRF token"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_alphanumeric_and_distinct() {
        let a = generate_csrf_token();
        let b = generate_csrf_token();
        assert_eq!(a.len(), CSRF_TOKEN_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
