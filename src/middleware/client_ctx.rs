use crate::middleware::csrf::get_or_create_csrf_token;
use crate::session::authenticate_client_by_session;
use crate::user::Profile;
use crate::web::notice::{take_notices, Notice};
use actix_session::Session;
use actix_web::dev::{
    self, Extensions, Payload, Service, ServiceRequest, ServiceResponse, Transform,
};
use actix_web::http::Method;
use actix_web::{web::Data, Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Client data stored for a single request cycle.
#[derive(Clone, Debug)]
pub struct ClientCtxInner {
    /// None is a guest.
    pub client: Option<Profile>,
    /// Randomly generated string for CSP.
    pub nonce: String,
    pub csrf_token: String,
    /// Flash notices queued by the previous request.
    pub notices: Vec<Notice>,
    /// Time the request started for page load statistics.
    pub request_start: Instant,
}

impl Default for ClientCtxInner {
    fn default() -> Self {
        Self {
            client: None,
            nonce: Self::nonce(),
            csrf_token: String::new(),
            notices: Vec::new(),
            request_start: Instant::now(),
        }
    }
}

impl ClientCtxInner {
    pub async fn from_session(session: &Session, consume_notices: bool) -> Self {
        let client = authenticate_client_by_session(session).await;

        let csrf_token = get_or_create_csrf_token(session).unwrap_or_else(|e| {
            log::error!("Unable to issue CSRF token: {}", e);
            String::new()
        });

        let notices = if consume_notices {
            take_notices(session)
        } else {
            Vec::new()
        };

        ClientCtxInner {
            client,
            csrf_token,
            notices,
            ..Default::default()
        }
    }

    /// Returns a hash unique to each request used for CSP.
    /// See: <https://developer.mozilla.org/en-US/docs/Web/HTML/Global_attributes/nonce>
    pub fn nonce() -> String {
        use std::time::{SystemTime, UNIX_EPOCH};

        let mut hasher = blake3::Hasher::new();
        match std::env::var("SALT") {
            Ok(v) => hasher.update(v.as_bytes()),
            Err(_) => hasher.update("NO_SALT_FOR_NONCE".as_bytes()),
        };
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        hasher.update(&millis.to_ne_bytes());
        hasher.update(&rand::random::<u64>().to_ne_bytes());
        hasher.finalize().to_string()
    }
}

/// Client context passed to routes.
/// Wraps ClientCtxInner, which is set at the beginning of the request.
#[derive(Clone, Debug)]
pub struct ClientCtx(Data<ClientCtxInner>);

impl Default for ClientCtx {
    fn default() -> Self {
        Self(Data::new(ClientCtxInner::default()))
    }
}

impl ClientCtx {
    pub fn get_or_default_from_extensions(extensions: &mut Extensions) -> Self {
        match extensions.get::<Data<ClientCtxInner>>() {
            Some(cbox) => Self(cbox.clone()),
            None => {
                let cbox = Data::new(ClientCtxInner::default());
                extensions.insert(cbox.clone());
                Self(cbox)
            }
        }
    }

    /// Returns either the user's id or None.
    pub fn get_id(&self) -> Option<i32> {
        self.0.client.as_ref().map(|u| u.id)
    }

    /// Returns either the user's name or the word for guest.
    pub fn get_name(&self) -> String {
        match &self.0.client {
            Some(user) => user.name.to_owned(),
            None => "Guest".to_owned(),
        }
    }

    pub fn get_csrf_token(&self) -> &str {
        &self.0.csrf_token
    }

    pub fn get_notices(&self) -> &[Notice] {
        &self.0.notices
    }

    pub fn site_name(&self) -> String {
        crate::app_config::site().name
    }

    pub fn is_user(&self) -> bool {
        self.0.client.is_some()
    }

    pub fn get_nonce(&self) -> &String {
        &self.0.nonce
    }

    pub fn request_time(&self) -> Duration {
        Instant::now() - self.0.request_start
    }

    /// Returns human readable representing request time.
    pub fn request_time_as_string(&self) -> String {
        let us = self.request_time().as_micros();
        if us > 5000 {
            format!("{}ms", us / 1000)
        } else {
            format!("{}μs", us)
        }
    }

    /// Require user to be logged in. Returns user_id or ErrorUnauthorized.
    pub fn require_login(&self) -> Result<i32, actix_web::Error> {
        self.get_id()
            .ok_or_else(|| actix_web::error::ErrorUnauthorized("Login required"))
    }
}

/// Provides `client: ClientCtx` in the parameters of route functions.
impl FromRequest for ClientCtx {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(ClientCtx::get_or_default_from_extensions(
            &mut req.extensions_mut(),
        )))
    }
}

impl<S: 'static, B> Transform<S, ServiceRequest> for ClientCtx
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ClientCtxMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ClientCtxMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct ClientCtxMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ClientCtxMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();

        // Borrows of `req` must be done in a precise way to avoid conflicts. This order is important.
        let (httpreq, payload) = req.into_parts();
        let session = Session::extract(&httpreq).into_inner();
        let req = ServiceRequest::from_parts(httpreq, payload);

        // Only full page loads show notices; background fetches leave them queued.
        let consume_notices = req.method() == Method::GET
            && !req.path().starts_with("/static/")
            && req
                .headers()
                .get("X-Requested-With")
                .map_or(true, |v| v != "XMLHttpRequest");

        Box::pin(async move {
            match session {
                Ok(session) => {
                    let inner = ClientCtxInner::from_session(&session, consume_notices).await;
                    req.extensions_mut().insert(Data::new(inner));
                }
                Err(err) => {
                    log::error!("Unable to extract Session data in middleware: {}", err);
                }
            };

            svc.call(req).await
        })
    }
}
