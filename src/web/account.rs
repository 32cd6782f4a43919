//! Registration, login and logout.

use crate::db::get_db_pool;
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::ClientCtx;
use crate::session;
use crate::user::{self, RegisterResult};
use crate::web::clubs::{first_validation_message, CsrfForm};
use crate::web::error::redirect;
use crate::web::notice;
use actix_session::Session;
use actix_web::{error, get, post, web, Error, HttpResponse};
use askama_actix::{Template, TemplateToResponse};
use serde::Deserialize;
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_register)
        .service(post_register)
        .service(view_login)
        .service(post_login)
        .service(post_logout);
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub client: ClientCtx,
    pub username: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub client: ClientCtx,
    pub username: String,
    pub error: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct RegisterFormData {
    pub csrf_token: String,
    #[validate(length(min = 1, max = 150, message = "Usernames must be 1 to 150 characters."))]
    pub username: String,
    #[validate(length(min = 8, max = 1000, message = "Passwords must be at least 8 characters."))]
    pub password: String,
    #[validate(must_match(other = "password", message = "The passwords do not match."))]
    pub password_confirm: String,
}

#[derive(Deserialize)]
pub struct LoginFormData {
    pub csrf_token: String,
    pub username: String,
    pub password: String,
}

#[get("/register/")]
pub async fn view_register(client: ClientCtx) -> HttpResponse {
    if client.is_user() {
        return redirect("/");
    }
    RegisterTemplate {
        client,
        username: String::new(),
        error: None,
    }
    .to_response()
}

#[post("/register/")]
pub async fn post_register(
    client: ClientCtx,
    cookies: Session,
    form: web::Form<RegisterFormData>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;

    let username = form.username.trim().to_owned();
    if let Err(e) = form.validate() {
        return Ok(RegisterTemplate {
            client,
            username,
            error: Some(first_validation_message(&e)),
        }
        .to_response());
    }
    if username.is_empty() {
        return Ok(RegisterTemplate {
            client,
            username,
            error: Some("Usernames must be 1 to 150 characters.".to_owned()),
        }
        .to_response());
    }

    let result = user::register(get_db_pool(), &username, &form.password)
        .await
        .map_err(|e| {
            log::error!("Registration failed: {}", e);
            error::ErrorInternalServerError("DB error")
        })?;

    match result {
        RegisterResult::Created(profile) => {
            session::log_in(&cookies, profile.id)?;
            notice::success(&cookies, format!("Welcome, {}!", profile.name));
            Ok(redirect("/"))
        }
        RegisterResult::NameTaken => Ok(RegisterTemplate {
            client,
            username,
            error: Some("That username is already taken.".to_owned()),
        }
        .to_response()),
    }
}

#[get("/login/")]
pub async fn view_login(client: ClientCtx) -> HttpResponse {
    if client.is_user() {
        return redirect("/");
    }
    LoginTemplate {
        client,
        username: String::new(),
        error: None,
    }
    .to_response()
}

#[post("/login/")]
pub async fn post_login(
    client: ClientCtx,
    cookies: Session,
    form: web::Form<LoginFormData>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;

    let username = form.username.trim();
    let profile = user::verify_credentials(get_db_pool(), username, &form.password)
        .await
        .map_err(|e| {
            log::error!("Login failed: {}", e);
            error::ErrorInternalServerError("DB error")
        })?;

    match profile {
        Some(profile) => {
            session::log_in(&cookies, profile.id)?;
            log::debug!("User {} logged in", profile.id);
            notice::success(&cookies, format!("Welcome back, {}!", profile.name));
            Ok(redirect("/"))
        }
        None => {
            log::debug!("login failure for {}", username);
            Ok(LoginTemplate {
                client,
                username: username.to_owned(),
                error: Some("Invalid username or password.".to_owned()),
            }
            .to_response())
        }
    }
}

#[post("/logout/")]
pub async fn post_logout(
    cookies: Session,
    form: web::Form<CsrfForm>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;
    session::log_out(&cookies);
    notice::success(&cookies, "You have been logged out.");
    Ok(redirect("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(password: &str, confirm: &str) -> RegisterFormData {
        RegisterFormData {
            csrf_token: String::new(),
            username: "alice".to_owned(),
            password: password.to_owned(),
            password_confirm: confirm.to_owned(),
        }
    }

    #[test]
    fn test_register_form_validation() {
        assert!(form("correct horse", "correct horse").validate().is_ok());

        let short = form("short", "short").validate().unwrap_err();
        assert_eq!(
            first_validation_message(&short),
            "Passwords must be at least 8 characters."
        );

        let mismatch = form("correct horse", "battery staple").validate().unwrap_err();
        assert_eq!(
            first_validation_message(&mismatch),
            "The passwords do not match."
        );
    }
}
