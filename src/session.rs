//! Cookie session helpers: who is signed in, and the password hasher.

use crate::db::get_db_pool;
use crate::user::Profile;
use actix_session::Session;
use argon2::Argon2;
use once_cell::sync::Lazy;

const USER_ID_KEY: &str = "user_id";

static ARGON2: Lazy<Argon2<'static>> = Lazy::new(Argon2::default);

pub fn get_argon2() -> &'static Argon2<'static> {
    &ARGON2
}

/// Marks the session as belonging to `user_id`.
pub fn log_in(session: &Session, user_id: i32) -> Result<(), actix_web::Error> {
    session.renew();
    session
        .insert(USER_ID_KEY, user_id)
        .map_err(|_| actix_web::error::ErrorInternalServerError("Failed to store session."))
}

/// Forgets the user and the CSRF token, keeping the cookie for notices.
pub fn log_out(session: &Session) {
    session.clear();
    session.renew();
}

/// Resolves the signed-in user, if the session names one that still exists.
pub async fn authenticate_client_by_session(session: &Session) -> Option<Profile> {
    let user_id = match session.get::<i32>(USER_ID_KEY) {
        Ok(Some(id)) => id,
        Ok(None) => return None,
        Err(e) => {
            log::warn!("Unreadable session user id: {}", e);
            return None;
        }
    };

    match Profile::get_by_id(get_db_pool(), user_id).await {
        Ok(Some(profile)) => Some(profile),
        Ok(None) => {
            log::debug!("Session refers to missing user {}", user_id);
            session.remove(USER_ID_KEY);
            None
        }
        Err(e) => {
            log::error!("Failed to load session user {}: {}", user_id, e);
            None
        }
    }
}
