//! Member roster and role administration.

use crate::club::{self, summary};
use crate::db::get_db_pool;
use crate::middleware::csrf::validate_csrf_token;
use crate::middleware::ClientCtx;
use crate::orm::clubs;
use crate::permission::{Action, ClubAccess, Role};
use crate::web::clubs::CsrfForm;
use crate::web::error::{club_error_redirect, club_error_status, redirect};
use crate::web::notice;
use actix_session::Session;
use actix_web::{error, get, post, web, Error, HttpResponse};
use askama_actix::{Template, TemplateToResponse};
use serde::Deserialize;
use std::str::FromStr;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_manage_roles)
        .service(update_member_role)
        .service(remove_member);
}

#[derive(Template)]
#[template(path = "roles/manage.html")]
pub struct ManageRolesTemplate {
    pub client: ClientCtx,
    pub club: clubs::Model,
    pub access: ClubAccess,
    pub members: Vec<summary::MemberRow>,
    pub roles: &'static [Role],
}

impl ManageRolesTemplate {
    pub fn can_remove(&self, row: &summary::MemberRow) -> bool {
        self.access.can(&Action::RemoveMember {
            target_role: row.member.role,
            target_user_id: row.member.user_id,
        })
    }

    pub fn has_role(&self, row: &summary::MemberRow, role: &Role) -> bool {
        row.member.role == *role
    }

    pub fn is_self(&self, row: &summary::MemberRow) -> bool {
        self.access.user_id == Some(row.member.user_id)
    }
}

#[derive(Deserialize)]
pub struct RoleFormData {
    pub csrf_token: String,
    pub role: String,
}

fn roles_url(club_id: i32) -> String {
    format!("/clubs/{}/manage-roles/", club_id)
}

#[get("/clubs/{club_id}/manage-roles/")]
pub async fn view_manage_roles(
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

    if let Err(e) = access.require(&Action::ManageRoles) {
        return club_error_redirect(&cookies, e, &format!("/clubs/{}/", club.id));
    }

    let members = summary::list_members(db, club.id)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(ManageRolesTemplate {
        client,
        club,
        access,
        members,
        roles: &Role::ALL,
    }
    .to_response())
}

#[post("/clubs/{club_id}/update-member-role/{member_id}/")]
pub async fn update_member_role(
    client: ClientCtx,
    cookies: Session,
    path: web::Path<(i32, i32)>,
    form: web::Form<RoleFormData>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;
    let user_id = client.require_login()?;
    let (club_id, member_id) = path.into_inner();
    let back = roles_url(club_id);

    // Unknown roles are refused before anything is read or written.
    let role = match Role::from_str(&form.role) {
        Ok(role) => role,
        Err(e) => return club_error_redirect(&cookies, e, &back),
    };

    match club::update_member_role(get_db_pool(), club_id, user_id, member_id, role).await {
        Ok(member) => {
            notice::success(&cookies, format!("Role updated to {}.", member.role));
            Ok(redirect(&back))
        }
        Err(e) => club_error_redirect(&cookies, e, &back),
    }
}

#[post("/clubs/{club_id}/remove-member/{member_id}/")]
pub async fn remove_member(
    client: ClientCtx,
    cookies: Session,
    path: web::Path<(i32, i32)>,
    form: web::Form<CsrfForm>,
) -> Result<HttpResponse, Error> {
    validate_csrf_token(&cookies, &form.csrf_token)?;
    let user_id = client.require_login()?;
    let (club_id, member_id) = path.into_inner();
    let back = roles_url(club_id);

    match club::remove_member(get_db_pool(), club_id, user_id, member_id).await {
        Ok(removed) if removed.user_id == user_id => {
            notice::success(&cookies, "You have left the club.");
            Ok(redirect("/"))
        }
        Ok(_) => {
            notice::success(&cookies, "Member removed.");
            Ok(redirect(&back))
        }
        Err(e) => club_error_redirect(&cookies, e, &back),
    }
}
