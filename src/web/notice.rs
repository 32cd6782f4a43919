//! Flash notices: queued in the session by one request, shown by the next page.

use actix_session::Session;
use serde::{Deserialize, Serialize};

const NOTICES_SESSION_KEY: &str = "notices";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    Success,
    Error,
}

impl NoticeLevel {
    /// CSS class of the notice box.
    pub fn class(&self) -> &'static str {
        match self {
            NoticeLevel::Success => "notice--success",
            NoticeLevel::Error => "notice--error",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

pub fn push_notice<M: Into<String>>(session: &Session, level: NoticeLevel, message: M) {
    let mut queued = session
        .get::<Vec<Notice>>(NOTICES_SESSION_KEY)
        .ok()
        .flatten()
        .unwrap_or_default();
    queued.push(Notice {
        level,
        message: message.into(),
    });
    if let Err(e) = session.insert(NOTICES_SESSION_KEY, queued) {
        log::error!("Unable to queue notice: {}", e);
    }
}

pub fn success<M: Into<String>>(session: &Session, message: M) {
    push_notice(session, NoticeLevel::Success, message);
}

pub fn error<M: Into<String>>(session: &Session, message: M) {
    push_notice(session, NoticeLevel::Error, message);
}

/// Removes and returns every queued notice.
pub fn take_notices(session: &Session) -> Vec<Notice> {
    match session.remove_as::<Vec<Notice>>(NOTICES_SESSION_KEY) {
        Some(Ok(notices)) => notices,
        Some(Err(raw)) => {
            log::warn!("Discarding unreadable notices: {}", raw);
            Vec::new()
        }
        None => Vec::new(),
    }
}
