use crate::app_config;
use crate::club::{self, summary, ClubDetails, JoinOutcome};
use crate::db::get_db_pool;
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::ClientCtx;
use crate::orm::{clubs, members};
use crate::permission::{Action, ClubAccess};
use crate::search::{self, DiffSimilarity};
use crate::web::error::{club_error_redirect, club_error_status, redirect};
use crate::web::notice;
use actix_session::Session;
use actix_web::{error, get, post, web, Error, HttpRequest, HttpResponse, Responder};
use askama_actix::{Template, TemplateToResponse};
use chrono::{TimeZone, Utc};
use sea_orm::{entity::*, query::*, DbErr};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use validator::{Validate, ValidationError};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    // Literal paths first; `/clubs/{id}/` would swallow them otherwise.
    conf.service(search_clubs_json)
        .service(view_create_club)
        .service(create_club_post)
        .service(view_clubs)
        .service(view_club)
        .service(view_edit_club)
        .service(edit_club_post)
        .service(join_club_post);
}

#[derive(Template)]
#[template(path = "clubs/list.html")]
pub struct ClubListTemplate {
    pub client: ClientCtx,
    pub query: String,
    pub clubs: Vec<ClubCard>,
}

/// A club on the listing, with whether the viewer already belongs to it.
pub struct ClubCard {
    pub club: clubs::Model,
    pub is_member: bool,
}

#[derive(Template)]
#[template(path = "clubs/detail.html")]
pub struct ClubDetailTemplate {
    pub client: ClientCtx,
    pub club: clubs::Model,
    pub access: ClubAccess,
    pub polls: Vec<summary::PollSummary>,
    pub members: Vec<summary::MemberRow>,
}

impl ClubDetailTemplate {
    pub fn can_edit(&self) -> bool {
        self.access.can(&Action::EditClub)
    }

    pub fn can_create_poll(&self) -> bool {
        self.access.can(&Action::CreatePoll)
    }

    pub fn can_manage_roles(&self) -> bool {
        self.access.can(&Action::ManageRoles)
    }
}

#[derive(Template)]
#[template(path = "clubs/form.html")]
pub struct ClubFormTemplate {
    pub client: ClientCtx,
    pub heading: &'static str,
    pub action: String,
    pub name: String,
    pub description: String,
    pub logo_url: String,
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Deserialize, Validate)]
pub struct ClubForm {
    pub csrf_token: String,
    #[validate(length(min = 1, max = 100, message = "Club names must be 1 to 100 characters."))]
    pub name: String,
    #[validate(length(max = 5000, message = "Descriptions are limited to 5000 characters."))]
    #[serde(default)]
    pub description: String,
    #[validate(custom = "validate_logo_url")]
    #[serde(default)]
    pub logo_url: String,
}

impl ClubForm {
    fn trimmed(self) -> Self {
        Self {
            name: self.name.trim().to_owned(),
            description: self.description.trim().to_owned(),
            logo_url: self.logo_url.trim().to_owned(),
            ..self
        }
    }

    /// Expects a form that has already been trimmed.
    fn details(&self) -> ClubDetails {
        ClubDetails {
            name: self.name.clone(),
            description: self.description.clone(),
            logo_url: if self.logo_url.is_empty() {
                None
            } else {
                Some(self.logo_url.clone())
            },
        }
    }
}

fn validate_logo_url(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.is_empty() || validator::validate_url(value) {
        Ok(())
    } else {
        let mut err = ValidationError::new("url");
        err.message = Some("The logo must be a valid URL.".into());
        Err(err)
    }
}

/// First human readable message out of a failed validation.
pub(super) fn first_validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Please check the form and try again.".to_owned())
}

#[derive(Deserialize)]
pub struct CsrfForm {
    pub csrf_token: String,
}

/// Machine readable club record.
#[derive(Debug, Serialize)]
pub struct ClubRecord {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub logo: Option<String>,
    pub created_at: String,
}

impl From<clubs::Model> for ClubRecord {
    fn from(club: clubs::Model) -> Self {
        Self {
            id: club.id,
            name: club.name,
            description: club.description,
            logo: club.logo_url,
            created_at: Utc.from_utc_datetime(&club.created_at).to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClubListJson {
    pub clubs: Vec<ClubRecord>,
}

impl ClubListJson {
    fn from_models(models: Vec<clubs::Model>) -> Self {
        Self {
            clubs: models.into_iter().map(ClubRecord::from).collect(),
        }
    }
}

/// Every club ranked against `query`.
async fn find_clubs(query: &str) -> Result<Vec<clubs::Model>, Error> {
    let candidates = club::all_clubs(get_db_pool()).await.map_err(|e| {
        log::error!("Unable to load clubs: {}", e);
        error::ErrorInternalServerError("Database error")
    })?;
    Ok(search::search(
        query,
        candidates,
        &app_config::search(),
        &DiffSimilarity,
    ))
}

async fn member_club_ids(user_id: Option<i32>) -> Result<HashSet<i32>, DbErr> {
    let user_id = match user_id {
        Some(id) => id,
        None => return Ok(HashSet::new()),
    };
    Ok(members::Entity::find()
        .filter(members::Column::UserId.eq(user_id))
        .all(get_db_pool())
        .await?
        .into_iter()
        .map(|m| m.club_id)
        .collect())
}

fn wants_json(req: &HttpRequest) -> bool {
    req.headers()
        .get("X-Requested-With")
        .map_or(false, |v| v == "XMLHttpRequest")
}

#[get("/clubs/search/")]
pub async fn search_clubs_json(query: web::Query<SearchQuery>) -> Result<impl Responder, Error> {
    let results = find_clubs(&query.q).await?;
    Ok(HttpResponse::Ok().json(ClubListJson::from_models(results)))
}

#[get("/clubs/")]
pub async fn view_clubs(
    req: HttpRequest,
    client: ClientCtx,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, Error> {
    let results = find_clubs(&query.q).await?;

    if wants_json(&req) {
        return Ok(HttpResponse::Ok().json(ClubListJson::from_models(results)));
    }

    let joined = member_club_ids(client.get_id())
        .await
        .map_err(error::ErrorInternalServerError)?;
    let clubs = results
        .into_iter()
        .map(|club| ClubCard {
            is_member: joined.contains(&club.id),
            club,
        })
        .collect();

    Ok(ClubListTemplate {
        client,
        query: query.into_inner().q,
        clubs,
    }
    .to_response())
}

#[get("/clubs/create/")]
pub async fn view_create_club(client: ClientCtx) -> Result<impl Responder, Error> {
    client.require_login()?;
    Ok(ClubFormTemplate {
        client,
        heading: "Create a club",
        action: "/clubs/create/".to_owned(),
        name: String::new(),
        description: String::new(),
        logo_url: String::new(),
        error: None,
    }
    .to_response())
}

#[post("/clubs/create/")]
pub async fn create_club_post(
    client: ClientCtx,
    cookies: Session,
    form: web::Form<ClubForm>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;
    let user_id = client.require_login()?;

    let form = form.into_inner().trimmed();
    if let Err(e) = form.validate() {
        return Ok(ClubFormTemplate {
            client,
            heading: "Create a club",
            action: "/clubs/create/".to_owned(),
            error: Some(first_validation_message(&e)),
            name: form.name,
            description: form.description,
            logo_url: form.logo_url,
        }
        .to_response());
    }

    match club::create_club(get_db_pool(), user_id, form.details()).await {
        Ok(club) => {
            notice::success(&cookies, format!("Club \"{}\" created.", club.name));
            Ok(redirect(&format!("/clubs/{}/", club.id)))
        }
        Err(e) => club_error_redirect(&cookies, e, "/clubs/create/"),
    }
}

#[get("/clubs/{club_id}/")]
pub async fn view_club(
    client: ClientCtx,
    cookies: Session,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let user_id = client.require_login()?;
    let club_id = path.into_inner();
    let db = get_db_pool();

    let club = club::find_club(db, club_id).await.map_err(club_error_status)?;
    let access = ClubAccess::load(db, Some(user_id), club.id)
        .await
        .map_err(error::ErrorInternalServerError)?;

    if let Err(e) = access.require(&Action::ViewClub) {
        return club_error_redirect(&cookies, e, "/clubs/");
    }

    let now = Utc::now().naive_utc();
    let polls = summary::active_polls(db, club.id, user_id, now)
        .await
        .map_err(error::ErrorInternalServerError)?;
    let members = summary::list_members(db, club.id)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(ClubDetailTemplate {
        client,
        club,
        access,
        polls,
        members,
    }
    .to_response())
}

#[get("/clubs/{club_id}/edit/")]
pub async fn view_edit_club(
    client: ClientCtx,
    cookies: Session,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let user_id = client.require_login()?;
    let db = get_db_pool();
    let club = club::find_club(db, path.into_inner())
        .await
        .map_err(club_error_status)?;

    let access = ClubAccess::load(db, Some(user_id), club.id)
        .await
        .map_err(error::ErrorInternalServerError)?;
    if let Err(e) = access.require(&Action::EditClub) {
        return club_error_redirect(&cookies, e, &format!("/clubs/{}/", club.id));
    }

    Ok(ClubFormTemplate {
        client,
        heading: "Edit club",
        action: format!("/clubs/{}/edit/", club.id),
        name: club.name,
        description: club.description,
        logo_url: club.logo_url.unwrap_or_default(),
        error: None,
    }
    .to_response())
}

#[post("/clubs/{club_id}/edit/")]
pub async fn edit_club_post(
    client: ClientCtx,
    cookies: Session,
    path: web::Path<i32>,
    form: web::Form<ClubForm>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;
    let user_id = client.require_login()?;
    let club_id = path.into_inner();
    let club_url = format!("/clubs/{}/", club_id);

    let form = form.into_inner().trimmed();
    if let Err(e) = form.validate() {
        return Ok(ClubFormTemplate {
            client,
            heading: "Edit club",
            action: format!("/clubs/{}/edit/", club_id),
            error: Some(first_validation_message(&e)),
            name: form.name,
            description: form.description,
            logo_url: form.logo_url,
        }
        .to_response());
    }

    match club::update_club(get_db_pool(), club_id, user_id, form.details()).await {
        Ok(_) => {
            notice::success(&cookies, "Club updated.");
            Ok(redirect(&club_url))
        }
        Err(e) => club_error_redirect(&cookies, e, &club_url),
    }
}

#[post("/clubs/{club_id}/join/")]
pub async fn join_club_post(
    client: ClientCtx,
    cookies: Session,
    path: web::Path<i32>,
    form: web::Form<CsrfForm>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;
    let user_id = client.require_login()?;
    let club_id = path.into_inner();

    match club::join_club(get_db_pool(), club_id, user_id).await {
        Ok(JoinOutcome::Joined(_)) => {
            notice::success(&cookies, "Welcome to the club!");
            Ok(redirect(&format!("/clubs/{}/", club_id)))
        }
        Ok(JoinOutcome::AlreadyMember) => {
            notice::error(&cookies, "You are already a member of this club.");
            Ok(redirect(&format!("/clubs/{}/", club_id)))
        }
        Err(e) => club_error_redirect(&cookies, e, "/clubs/"),
    }
}
