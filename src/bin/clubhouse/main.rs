use actix_session::{config::PersistentSession, storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::{Key, SameSite};
use actix_web::http::header;
use actix_web::http::StatusCode;
use actix_web::middleware::{DefaultHeaders, ErrorHandlers, Logger};
use actix_web::{App, HttpServer};
use anyhow::Context;
use clubhouse::db::{create_schema, init_db};
use clubhouse::middleware::ClientCtx;
use clubhouse::web::error;
use env_logger::Env;

const DEFAULT_DATABASE_URL: &str = "sqlite://clubhouse.db?mode=rwc";

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_lib_mods();
    clubhouse::app_config::init();

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| {
        log::warn!("DATABASE_URL is not set, using {}", DEFAULT_DATABASE_URL);
        DEFAULT_DATABASE_URL.to_owned()
    });
    let db = init_db(database_url)
        .await
        .context("Unable to connect to the database")?;
    create_schema(db)
        .await
        .context("Unable to create the database schema")?;

    let secret_key = session_key();
    let server_config = clubhouse::app_config::server();

    HttpServer::new(move || {
        // Order of middleware IS IMPORTANT and is in REVERSE EXECUTION ORDER.
        App::new()
            .wrap(
                DefaultHeaders::new()
                    .add((header::X_FRAME_OPTIONS, "DENY"))
                    .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
                    .add(("X-XSS-Protection", "0"))
                    .add(("Referrer-Policy", "strict-origin-when-cross-origin")),
            )
            .wrap(
                ErrorHandlers::new()
                    .handler(StatusCode::BAD_REQUEST, error::render_400)
                    .handler(StatusCode::UNAUTHORIZED, error::render_401)
                    .handler(StatusCode::FORBIDDEN, error::render_403)
                    .handler(StatusCode::NOT_FOUND, error::render_404)
                    .handler(StatusCode::INTERNAL_SERVER_ERROR, error::render_500),
            )
            .wrap(ClientCtx::default())
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
                    .cookie_same_site(SameSite::Lax)
                    .cookie_secure(server_config.secure_cookies)
                    .session_lifecycle(PersistentSession::default())
                    .build(),
            )
            .wrap(Logger::new("%a %r %s %T"))
            .configure(clubhouse::web::configure)
    })
    .bind(&server_config.bind_address)
    .with_context(|| format!("Unable to bind {}", server_config.bind_address))?
    .run()
    .await?;

    Ok(())
}

/// Initialize third party crates we rely on but don't have control over.
fn init_lib_mods() {
    // A missing .env file is fine; the environment may already be set.
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("debug")).init();
}

/// Key for signing session cookies, from SECRET_KEY when it is long enough.
fn session_key() -> Key {
    match std::env::var("SECRET_KEY") {
        Ok(key) => match Key::try_from(key.as_bytes()) {
            Ok(key) => return key,
            Err(err) => log::warn!("SECRET_KEY was invalid. Reason: {:?}", err),
        },
        Err(err) => log::warn!("SECRET_KEY was not set. Reason: {:?}", err),
    }
    log::warn!(
        "Using a random key for signing session cookies. Sessions will be invalidated \
         every time the application is restarted. A secret key must be at least 64 bytes."
    );
    Key::generate()
}
