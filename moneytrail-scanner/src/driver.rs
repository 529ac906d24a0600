//! Seams to the rendering engine and to the login subsystem.
//!
//! The crawler never talks to a browser directly. It drives a [`PageDriver`]
//! one navigation at a time and hands authentication to an [`Authenticator`].
//! Every driver call reports failure through [`DriverError`] and every call
//! site in the crawler handles the error branch explicitly.

use crate::error::DriverError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::time::Duration;

/// Outcome of a completed navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    /// URL the page landed on after redirects.
    pub final_url: String,
    pub status_code: Option<u16>,
}

/// Run a driver call under a hard time limit, folding an elapsed limit into
/// [`DriverError::Timeout`].
pub async fn bounded<T, F>(limit: Duration, action: &str, call: F) -> Result<T, DriverError>
where
    F: Future<Output = Result<T, DriverError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(DriverError::timeout(limit, action)),
    }
}

/// A single rendering-engine page. Implementations own the underlying session
/// and must release it in [`PageDriver::close`].
#[allow(async_fn_in_trait)]
pub trait PageDriver {
    /// Acquire the session. Called exactly once before any other method.
    async fn open(&mut self) -> Result<(), DriverError>;

    async fn goto(&mut self, url: &str) -> Result<Navigation, DriverError>;

    /// URL of the page currently loaded, if any.
    fn current_url(&self) -> Option<String>;

    /// Serialized markup of the current page.
    async fn content(&mut self) -> Result<String, DriverError>;

    async fn screenshot(&mut self, path: &Path) -> Result<(), DriverError>;

    /// Raw `href` targets of every anchor on the current page.
    async fn anchor_targets(&mut self) -> Result<Vec<String>, DriverError>;

    /// Labelled strings the page renders outside its static markup (hidden
    /// input values, copy-button neighbours). Fed to extraction as positive
    /// context.
    async fn supplementary_strings(&mut self) -> Result<Vec<(String, String)>, DriverError> {
        Ok(Vec::new())
    }

    fn supports_screenshots(&self) -> bool {
        true
    }

    /// Release the session. Must be safe to call after a failed `open`.
    async fn close(&mut self);
}

#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub email: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            secret: secret.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginOutcome {
    pub success: bool,
    pub status: String,
    pub notes: Vec<String>,
}

impl LoginOutcome {
    pub fn succeeded(status: impl Into<String>) -> Self {
        Self {
            success: true,
            status: status.into(),
            notes: Vec::new(),
        }
    }

    pub fn failed(status: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            success: false,
            status: status.into(),
            notes: vec![note.into()],
        }
    }
}

/// Login collaborator. A failed outcome aborts the run before anything is queued.
#[allow(async_fn_in_trait)]
pub trait Authenticator {
    async fn perform_login<D: PageDriver>(
        &self,
        driver: &mut D,
        credentials: &Credentials,
    ) -> LoginOutcome;
}

/// Authenticator for sites crawled without an account.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousSession;

impl Authenticator for AnonymousSession {
    async fn perform_login<D: PageDriver>(
        &self,
        _driver: &mut D,
        _credentials: &Credentials,
    ) -> LoginOutcome {
        LoginOutcome::succeeded("anonymous")
    }
}
