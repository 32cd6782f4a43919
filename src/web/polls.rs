//! Poll creation and voting endpoints

use crate::club::{self, NewPoll};
use crate::db::get_db_pool;
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::ClientCtx;
use crate::orm::{clubs, polls};
use crate::permission::{Action, ClubAccess};
use crate::web::clubs::first_validation_message;
use crate::web::error::{club_error_redirect, club_error_status, redirect};
use crate::web::notice;
use actix_session::Session;
use actix_web::{error, get, post, web, Error, HttpResponse};
use askama_actix::{Template, TemplateToResponse};
use chrono::{NaiveDateTime, Utc};
use sea_orm::EntityTrait;
use serde::Deserialize;
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_create_poll)
        .service(create_poll_post)
        .service(vote_on_poll);
}

const END_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";
const MAX_OPTIONS: usize = 20;
const MAX_OPTION_LENGTH: usize = 200;

#[derive(Template)]
#[template(path = "polls/create.html")]
pub struct CreatePollTemplate {
    pub client: ClientCtx,
    pub club: clubs::Model,
    pub title: String,
    pub description: String,
    pub ends_at: String,
    pub options: String,
    pub error: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct NewPollFormData {
    pub csrf_token: String,
    #[validate(length(min = 1, max = 200, message = "Poll titles must be 1 to 200 characters."))]
    pub title: String,
    #[validate(length(max = 5000, message = "Descriptions are limited to 5000 characters."))]
    #[serde(default)]
    pub description: String,
    pub ends_at: String,
    /// One option per line.
    #[serde(default)]
    pub options: String,
}

impl NewPollFormData {
    fn trimmed(self) -> Self {
        Self {
            title: self.title.trim().to_owned(),
            description: self.description.trim().to_owned(),
            ..self
        }
    }

    /// Expects a form that has already been trimmed.
    fn to_new_poll(&self) -> Result<NewPoll, String> {
        self.validate().map_err(|e| first_validation_message(&e))?;
        let ends_at = parse_end_time(&self.ends_at)?;
        let options = parse_poll_options(&self.options)?;
        Ok(NewPoll {
            title: self.title.clone(),
            description: self.description.clone(),
            ends_at,
            options,
        })
    }
}

#[derive(Deserialize)]
pub struct VoteFormData {
    pub csrf_token: String,
    pub option_id: Option<i32>,
}

pub fn parse_end_time(value: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value.trim(), END_TIME_FORMAT)
        .map_err(|_| "Please give the end time as a date and time.".to_owned())
}

/// Splits the options textarea into trimmed, non-empty lines.
pub fn parse_poll_options(text: &str) -> Result<Vec<String>, String> {
    let options: Vec<String> = text
        .lines()
        .map(|line| line.trim().to_owned())
        .filter(|line| !line.is_empty())
        .collect();

    if options.len() < 2 {
        return Err("Polls need at least 2 options.".to_owned());
    }
    if options.len() > MAX_OPTIONS {
        return Err(format!("Polls cannot have more than {} options.", MAX_OPTIONS));
    }
    if options.iter().any(|o| o.chars().count() > MAX_OPTION_LENGTH) {
        return Err(format!(
            "Each poll option must be {} characters or less.",
            MAX_OPTION_LENGTH
        ));
    }

    Ok(options)
}

/// Loads the club and refuses non-admins with a notice.
async fn club_for_poll_admin(
    cookies: &Session,
    user_id: i32,
    club_id: i32,
) -> Result<Result<clubs::Model, HttpResponse>, Error> {
    let db = get_db_pool();
    let club = club::find_club(db, club_id).await.map_err(club_error_status)?;
    let access = ClubAccess::load(db, Some(user_id), club.id)
        .await
        .map_err(error::ErrorInternalServerError)?;

    match access.require(&Action::CreatePoll) {
        Ok(()) => Ok(Ok(club)),
        Err(e) => club_error_redirect(cookies, e, &format!("/clubs/{}/", club.id)).map(Err),
    }
}

#[get("/clubs/{club_id}/polls/create/")]
pub async fn view_create_poll(
    client: ClientCtx,
    cookies: Session,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let user_id = client.require_login()?;
    let club = match club_for_poll_admin(&cookies, user_id, path.into_inner()).await? {
        Ok(club) => club,
        Err(refused) => return Ok(refused),
    };

    Ok(CreatePollTemplate {
        client,
        club,
        title: String::new(),
        description: String::new(),
        ends_at: String::new(),
        options: String::new(),
        error: None,
    }
    .to_response())
}

#[post("/clubs/{club_id}/polls/create/")]
pub async fn create_poll_post(
    client: ClientCtx,
    cookies: Session,
    path: web::Path<i32>,
    form: web::Form<NewPollFormData>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;
    let user_id = client.require_login()?;
    let club = match club_for_poll_admin(&cookies, user_id, path.into_inner()).await? {
        Ok(club) => club,
        Err(refused) => return Ok(refused),
    };

    let form = form.into_inner().trimmed();
    let new_poll = match form.to_new_poll() {
        Ok(poll) => poll,
        Err(message) => {
            return Ok(CreatePollTemplate {
                client,
                club,
                title: form.title,
                description: form.description,
                ends_at: form.ends_at,
                options: form.options,
                error: Some(message),
            }
            .to_response());
        }
    };

    let club_url = format!("/clubs/{}/", club.id);
    match club::create_poll(get_db_pool(), club.id, user_id, new_poll).await {
        Ok(poll) => {
            log::info!("User {} created poll {} in club {}", user_id, poll.id, club.id);
            notice::success(&cookies, "Poll created.");
            Ok(redirect(&club_url))
        }
        Err(e) => club_error_redirect(&cookies, e, &club_url),
    }
}

#[post("/polls/{poll_id}/vote/")]
pub async fn vote_on_poll(
    client: ClientCtx,
    cookies: Session,
    path: web::Path<i32>,
    form: web::Form<VoteFormData>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;
    let user_id = client.require_login()?;
    let db = get_db_pool();

    let poll = polls::Entity::find_by_id(path.into_inner())
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Poll not found."))?;
    let club_url = format!("/clubs/{}/", poll.club_id);

    let access = ClubAccess::load(db, Some(user_id), poll.club_id)
        .await
        .map_err(error::ErrorInternalServerError)?;
    if let Err(e) = access.require(&Action::VotePoll) {
        return club_error_redirect(&cookies, e, &club_url);
    }

    let option_id = match form.option_id {
        Some(id) => id,
        None => {
            notice::error(&cookies, "Please choose an option.");
            return Ok(redirect(&club_url));
        }
    };

    let now = Utc::now().naive_utc();
    match club::cast_poll_vote(db, poll.id, user_id, option_id, now).await {
        Ok(_) => {
            notice::success(&cookies, "Your vote has been recorded.");
            Ok(redirect(&club_url))
        }
        Err(e) => club_error_redirect(&cookies, e, &club_url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_poll_options_skips_blank_lines() {
        let options = parse_poll_options("  Pizza \n\n\r\nTacos\r\n   \nSushi").unwrap();
        assert_eq!(options, vec!["Pizza", "Tacos", "Sushi"]);
    }

    #[test]
    fn test_parse_poll_options_needs_two() {
        assert!(parse_poll_options("Only one\n\n").is_err());
        assert!(parse_poll_options("").is_err());
    }

    #[test]
    fn test_parse_poll_options_limits() {
        let many = (0..=MAX_OPTIONS).map(|i| format!("Option {}\n", i)).collect::<String>();
        assert!(parse_poll_options(&many).is_err());

        let long = format!("{}\nShort", "x".repeat(MAX_OPTION_LENGTH + 1));
        assert!(parse_poll_options(&long).is_err());
    }

    #[test]
    fn test_parse_end_time() {
        let parsed = parse_end_time("2030-01-15T18:45").unwrap();
        assert_eq!(parsed.to_string(), "2030-01-15 18:45:00");
        assert!(parse_end_time("15/01/2030").is_err());
        assert!(parse_end_time("").is_err());
    }

    #[test]
    fn test_form_to_new_poll() {
        let form = NewPollFormData {
            csrf_token: String::new(),
            title: " Lunch ".to_owned(),
            description: String::new(),
            ends_at: "2030-01-15T18:45".to_owned(),
            options: "Pizza\nTacos".to_owned(),
        };
        let poll = form.trimmed().to_new_poll().unwrap();
        assert_eq!(poll.title, "Lunch");
        assert_eq!(poll.options.len(), 2);

        let untitled = NewPollFormData {
            csrf_token: String::new(),
            title: String::new(),
            description: String::new(),
            ends_at: "2030-01-15T18:45".to_owned(),
            options: "Pizza\nTacos".to_owned(),
        };
        assert_eq!(
            untitled.trimmed().to_new_poll().unwrap_err(),
            "Poll titles must be 1 to 200 characters."
        );
    }

    #[test]
    fn test_whitespace_title_is_rejected() {
        let form = NewPollFormData {
            csrf_token: String::new(),
            title: " \t  ".to_owned(),
            description: String::new(),
            ends_at: "2030-01-15T18:45".to_owned(),
            options: "Pizza\nTacos".to_owned(),
        };
        assert_eq!(
            form.trimmed().to_new_poll().unwrap_err(),
            "Poll titles must be 1 to 200 characters."
        );
    }
}
