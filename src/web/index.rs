use crate::club;
use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::clubs;
use actix_web::{error, get, Error, HttpResponse};
use askama_actix::{Template, TemplateToResponse};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_index);
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct IndexTemplate {
    pub client: ClientCtx,
    /// Clubs the viewer belongs to; empty for guests.
    pub clubs: Vec<clubs::Model>,
}

#[get("/")]
pub async fn view_index(client: ClientCtx) -> Result<HttpResponse, Error> {
    let clubs = match client.get_id() {
        Some(user_id) => club::clubs_for_user(get_db_pool(), user_id)
            .await
            .map_err(|e| {
                log::error!("Unable to load clubs for user {}: {}", user_id, e);
                error::ErrorInternalServerError("DB error")
            })?,
        None => Vec::new(),
    };

    Ok(IndexTemplate { client, clubs }.to_response())
}
