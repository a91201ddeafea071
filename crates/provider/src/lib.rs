//! LTI 1.x tool provider launch verification.
//!
//! A tool consumer (an LMS) launches this application by POSTing OAuth 1.0a
//! signed form parameters. This crate verifies those launches, tracks the
//! resulting authenticated session, and exposes the launch parameters as
//! user identity, roles and course context.

use std::sync::Arc;
use std::time::Duration;

use sea_orm::Database;

use crate::config::AppConfig;
use crate::error::LtiError;
use crate::lti::LtiContext;
use crate::request::SessionSettings;
use crate::session::SessionStore;

pub mod config;
pub mod consumer;
pub mod course_context;
pub mod entity;
pub mod error;
pub mod lti;
pub mod oauth1;
pub mod params;
pub mod request;
pub mod roles;
pub mod session;

pub use error::{LtiError as Error, SignatureError};
pub use lti::LtiLaunch;
pub use request::LaunchRequest;
pub use roles::{RequestType, RoleType};

#[derive(Clone)]
pub struct AppResources {
    pub lti: LtiContext,
    pub sessions: SessionSettings,
    pub config: Arc<AppConfig>,
}

impl AppResources {
    /// Connects to the database and builds the shared LTI collaborators.
    pub async fn connect(config: AppConfig) -> Result<Self, LtiError> {
        let db = Database::connect(&config.database_url).await?;
        let lti = LtiContext::from_config(&config, db)?;
        let sessions = SessionSettings::new(
            SessionStore::new(Duration::from_secs(config.lti.session_ttl)),
            config.lti.session_cookie.clone(),
        );
        Ok(Self {
            lti,
            sessions,
            config: Arc::new(config),
        })
    }
}
