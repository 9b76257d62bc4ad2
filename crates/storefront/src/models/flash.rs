//! Flash notifications.
//!
//! A flash is a one-shot notification (title plus description) shown on the
//! next rendered page. Handlers that redirect push flashes into the session;
//! handlers that render can also pass request-local flashes straight to the
//! template.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::session_keys;

/// Flash severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Success,
    Error,
}

/// A one-shot notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub title: String,
    pub description: String,
}

impl Flash {
    /// Success notification.
    #[must_use]
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            title: title.into(),
            description: description.into(),
        }
    }

    /// Error notification.
    #[must_use]
    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            title: title.into(),
            description: description.into(),
        }
    }

    /// Whether this is an error notification.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.kind, FlashKind::Error)
    }

    /// CSS modifier class for the template.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self.kind {
            FlashKind::Success => "flash--success",
            FlashKind::Error => "flash--error",
        }
    }
}

/// Queue a flash for the next rendered page.
///
/// Session failures are logged and the flash is dropped.
pub async fn push_flash(session: &Session, flash: Flash) {
    let mut pending: Vec<Flash> = session
        .get(session_keys::FLASH)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    pending.push(flash);

    if let Err(e) = session.insert(session_keys::FLASH, pending).await {
        tracing::error!("Failed to store flash in session: {e}");
    }
}

/// Take every queued flash, leaving none behind.
pub async fn take_flashes(session: &Session) -> Vec<Flash> {
    match session.remove::<Vec<Flash>>(session_keys::FLASH).await {
        Ok(flashes) => flashes.unwrap_or_default(),
        Err(e) => {
            tracing::error!("Failed to read flashes from session: {e}");
            Vec::new()
        }
    }
}
