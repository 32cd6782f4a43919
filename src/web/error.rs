use crate::club::ClubError;
use crate::middleware::ClientCtx;
use crate::web::notice;
use actix_session::{Session, SessionExt};
use actix_web::body::MessageBody;
use actix_web::dev::ServiceResponse;
use actix_web::http::header;
use actix_web::middleware::ErrorHandlerResponse;
use actix_web::{error, Error, HttpMessage, HttpResponse, Result};
use askama_actix::Template;

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub client: ClientCtx,
    pub status: u16,
    pub title: &'static str,
    pub message: &'static str,
}

pub fn render_400<B: MessageBody + 'static>(
    res: ServiceResponse<B>,
) -> Result<ErrorHandlerResponse<B>> {
    render_error_page(
        res,
        "Bad request",
        "The submitted data could not be understood.",
    )
}

/// Guests hitting a login-only page are sent to the login form.
pub fn render_401<B: MessageBody + 'static>(
    res: ServiceResponse<B>,
) -> Result<ErrorHandlerResponse<B>> {
    let (req, _) = res.into_parts();
    notice::error(&req.get_session(), "Please log in to continue.");
    let res = HttpResponse::Found()
        .append_header((header::LOCATION, "/login/"))
        .finish();
    Ok(ErrorHandlerResponse::Response(
        ServiceResponse::new(req, res).map_into_right_body(),
    ))
}

pub fn render_403<B: MessageBody + 'static>(
    res: ServiceResponse<B>,
) -> Result<ErrorHandlerResponse<B>> {
    render_error_page(
        res,
        "Forbidden",
        "The request was refused. Reload the page and try again.",
    )
}

pub fn render_404<B: MessageBody + 'static>(
    res: ServiceResponse<B>,
) -> Result<ErrorHandlerResponse<B>> {
    render_error_page(
        res,
        "Not found",
        "The page you requested does not exist.",
    )
}

pub fn render_500<B: MessageBody + 'static>(
    res: ServiceResponse<B>,
) -> Result<ErrorHandlerResponse<B>> {
    render_error_page(
        res,
        "Server error",
        "Something went wrong on our end.",
    )
}

fn render_error_page<B: MessageBody + 'static>(
    res: ServiceResponse<B>,
    title: &'static str,
    message: &'static str,
) -> Result<ErrorHandlerResponse<B>> {
    let status = res.status();
    let (req, _) = res.into_parts();
    let client = ClientCtx::get_or_default_from_extensions(&mut req.extensions_mut());

    let body = ErrorTemplate {
        client,
        status: status.as_u16(),
        title,
        message,
    }
    .render()
    .map_err(error::ErrorInternalServerError)?;

    let res = HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(body);
    Ok(ErrorHandlerResponse::Response(
        ServiceResponse::new(req, res).map_into_right_body(),
    ))
}

/// 302 to `location`.
pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .append_header((header::LOCATION, location))
        .finish()
}

/// Turns a refused club operation into a notice and a redirect.
///
/// Missing records become the 404 page. Store failures are logged and the
/// user only sees the generic notice.
pub fn club_error_redirect(
    session: &Session,
    err: ClubError,
    location: &str,
) -> Result<HttpResponse, Error> {
    match err {
        ClubError::NotFound(what) => Err(error::ErrorNotFound(format!("{} not found.", what))),
        ClubError::Database(ref e) => {
            log::error!("Club operation failed: {}", e);
            notice::error(session, err.to_string());
            Ok(redirect(location))
        }
        err => {
            log::debug!("Club operation refused: {}", err);
            notice::error(session, err.to_string());
            Ok(redirect(location))
        }
    }
}

/// Maps a club error on a page that cannot redirect anywhere useful.
pub fn club_error_status(err: ClubError) -> Error {
    match err {
        ClubError::NotFound(what) => error::ErrorNotFound(format!("{} not found.", what)),
        ClubError::PermissionDenied(reason) => error::ErrorForbidden(reason),
        ClubError::Database(e) => {
            log::error!("Club query failed: {}", e);
            error::ErrorInternalServerError("Database error")
        }
        other => error::ErrorBadRequest(other.to_string()),
    }
}
