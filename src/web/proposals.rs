use crate::club::{self, summary, NewProposal, Retraction};
use crate::db::get_db_pool;
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::ClientCtx;
use crate::orm::{clubs, proposals};
use crate::permission::{Action, ClubAccess};
use crate::web::clubs::{first_validation_message, CsrfForm};
use crate::web::error::{club_error_redirect, club_error_status, redirect};
use crate::web::notice;
use actix_session::Session;
use actix_web::{error, get, post, web, Error, HttpResponse};
use askama_actix::{Template, TemplateToResponse};
use chrono::Utc;
use sea_orm::EntityTrait;
use serde::Deserialize;
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_proposals)
        .service(view_create_proposal)
        .service(create_proposal_post)
        .service(vote_proposal)
        .service(unvote_proposal)
        .service(delete_proposal);
}

#[derive(Template)]
#[template(path = "proposals/list.html")]
pub struct ProposalListTemplate {
    pub client: ClientCtx,
    pub club: clubs::Model,
    pub access: ClubAccess,
    pub proposals: Vec<summary::ProposalSummary>,
}

impl ProposalListTemplate {
    pub fn can_delete(&self, summary: &summary::ProposalSummary) -> bool {
        self.access.can(&Action::DeleteProposal {
            creator_id: summary.proposal.created_by,
        })
    }
}

#[derive(Template)]
#[template(path = "proposals/create.html")]
pub struct CreateProposalTemplate {
    pub client: ClientCtx,
    pub club: clubs::Model,
    pub title: String,
    pub description: String,
    pub error: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct NewProposalFormData {
    pub csrf_token: String,
    #[validate(length(min = 1, max = 200, message = "Proposal titles must be 1 to 200 characters."))]
    pub title: String,
    #[validate(length(max = 5000, message = "Descriptions are limited to 5000 characters."))]
    #[serde(default)]
    pub description: String,
}

impl NewProposalFormData {
    fn trimmed(self) -> Self {
        Self {
            title: self.title.trim().to_owned(),
            description: self.description.trim().to_owned(),
            ..self
        }
    }
}

fn proposals_url(club_id: i32) -> String {
    format!("/clubs/{}/proposals/", club_id)
}

/// Loads a club and the viewer's membership, refusing with a notice when
/// `action` is not allowed.
async fn club_with_access(
    cookies: &Session,
    user_id: i32,
    club_id: i32,
    action: Action,
) -> Result<Result<(clubs::Model, ClubAccess), HttpResponse>, Error> {
    let db = get_db_pool();
    let club = club::find_club(db, club_id).await.map_err(club_error_status)?;
    let access = ClubAccess::load(db, Some(user_id), club.id)
        .await
        .map_err(error::ErrorInternalServerError)?;

    match access.require(&action) {
        Ok(()) => Ok(Ok((club, access))),
        Err(e) => club_error_redirect(cookies, e, &format!("/clubs/{}/", club.id)).map(Err),
    }
}

async fn find_proposal(proposal_id: i32) -> Result<proposals::Model, Error> {
    proposals::Entity::find_by_id(proposal_id)
        .one(get_db_pool())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Proposal not found."))
}

#[get("/clubs/{club_id}/proposals/")]
pub async fn view_proposals(
    client: ClientCtx,
    cookies: Session,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let user_id = client.require_login()?;
    let (club, access) =
        match club_with_access(&cookies, user_id, path.into_inner(), Action::ViewProposals).await? {
            Ok(found) => found,
            Err(refused) => return Ok(refused),
        };

    let proposals = summary::list_proposals(get_db_pool(), club.id, user_id)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(ProposalListTemplate {
        client,
        club,
        access,
        proposals,
    }
    .to_response())
}

#[get("/clubs/{club_id}/proposals/create/")]
pub async fn view_create_proposal(
    client: ClientCtx,
    cookies: Session,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let user_id = client.require_login()?;
    let (club, _) =
        match club_with_access(&cookies, user_id, path.into_inner(), Action::CreateProposal).await? {
            Ok(found) => found,
            Err(refused) => return Ok(refused),
        };

    Ok(CreateProposalTemplate {
        client,
        club,
        title: String::new(),
        description: String::new(),
        error: None,
    }
    .to_response())
}

#[post("/clubs/{club_id}/proposals/create/")]
pub async fn create_proposal_post(
    client: ClientCtx,
    cookies: Session,
    path: web::Path<i32>,
    form: web::Form<NewProposalFormData>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;
    let user_id = client.require_login()?;
    let club_id = path.into_inner();

    let form = form.into_inner().trimmed();
    if let Err(e) = form.validate() {
        let club = club::find_club(get_db_pool(), club_id)
            .await
            .map_err(club_error_status)?;
        return Ok(CreateProposalTemplate {
            client,
            club,
            title: form.title,
            description: form.description,
            error: Some(first_validation_message(&e)),
        }
        .to_response());
    }

    let new_proposal = NewProposal {
        title: form.title,
        description: form.description,
    };

    match club::create_proposal(get_db_pool(), club_id, user_id, new_proposal).await {
        Ok(_) => {
            notice::success(&cookies, "Proposal created.");
            Ok(redirect(&proposals_url(club_id)))
        }
        Err(e) => club_error_redirect(&cookies, e, &proposals_url(club_id)),
    }
}

#[post("/proposals/{proposal_id}/vote/")]
pub async fn vote_proposal(
    client: ClientCtx,
    cookies: Session,
    path: web::Path<i32>,
    form: web::Form<CsrfForm>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;
    let user_id = client.require_login()?;
    let proposal = find_proposal(path.into_inner()).await?;
    let back = proposals_url(proposal.club_id);

    let now = Utc::now().naive_utc();
    match club::cast_proposal_vote(get_db_pool(), proposal.id, user_id, now).await {
        Ok(_) => {
            notice::success(&cookies, "Your vote has been recorded.");
            Ok(redirect(&back))
        }
        Err(e) => club_error_redirect(&cookies, e, &back),
    }
}

#[post("/proposals/{proposal_id}/unvote/")]
pub async fn unvote_proposal(
    client: ClientCtx,
    cookies: Session,
    path: web::Path<i32>,
    form: web::Form<CsrfForm>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;
    let user_id = client.require_login()?;
    let proposal = find_proposal(path.into_inner()).await?;
    let back = proposals_url(proposal.club_id);

    match club::retract_proposal_vote(get_db_pool(), proposal.id, user_id).await {
        Ok(Retraction::Retracted) => {
            notice::success(&cookies, "Your vote has been withdrawn.");
            Ok(redirect(&back))
        }
        Ok(Retraction::NothingToRetract) => {
            notice::error(&cookies, "You have not voted on this proposal.");
            Ok(redirect(&back))
        }
        Err(e) => club_error_redirect(&cookies, e, &back),
    }
}

#[post("/proposals/{proposal_id}/delete/")]
pub async fn delete_proposal(
    client: ClientCtx,
    cookies: Session,
    path: web::Path<i32>,
    form: web::Form<CsrfForm>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;
    let user_id = client.require_login()?;
    let proposal = find_proposal(path.into_inner()).await?;
    let back = proposals_url(proposal.club_id);

    match club::delete_proposal(get_db_pool(), proposal.id, user_id).await {
        Ok(deleted) => {
            notice::success(&cookies, format!("Proposal \"{}\" deleted.", deleted.title));
            Ok(redirect(&back))
        }
        Err(e) => club_error_redirect(&cookies, e, &back),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(title: &str) -> NewProposalFormData {
        NewProposalFormData {
            csrf_token: String::new(),
            title: title.to_owned(),
            description: "  Meet on Fridays  ".to_owned(),
        }
        .trimmed()
    }

    #[test]
    fn test_trimmed_form_validates() {
        let form = form("  Move meetings  ");
        assert!(form.validate().is_ok());
        assert_eq!(form.title, "Move meetings");
        assert_eq!(form.description, "Meet on Fridays");
    }

    #[test]
    fn test_whitespace_title_is_rejected() {
        let errors = form(" \n  ").validate().unwrap_err();
        assert_eq!(
            first_validation_message(&errors),
            "Proposal titles must be 1 to 200 characters."
        );
    }
}
