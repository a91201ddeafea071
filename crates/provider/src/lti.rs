//! Launch verification.
//!
//! [`LtiLaunch`] is created per request with the verification mode the
//! handler requires. [`LtiLaunch::verify`] decides whether the request is a
//! trustworthy launch (or continues one) and, for signed launches, keeps the
//! decoded parameters for the accessor methods.

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::{AppConfig, ConfigError};
use crate::consumer::ConsumerRegistry;
use crate::course_context::CourseContextRepository;
use crate::entity::lti_course_context;
use crate::error::{LtiError, SignatureError};
use crate::oauth1::{HmacSha1Verifier, SignatureVerifier};
use crate::params::LaunchParameters;
use crate::request::LaunchRequest;
use crate::roles::{RequestType, RoleType};
use crate::session::Session;

/// Collaborators shared by every launch: built once at startup and cloned
/// into each request.
#[derive(Clone)]
pub struct LtiContext {
    consumers: Arc<ConsumerRegistry>,
    verifier: Arc<dyn SignatureVerifier>,
    course_contexts: CourseContextRepository,
}

impl LtiContext {
    pub fn new(
        consumers: ConsumerRegistry,
        verifier: Arc<dyn SignatureVerifier>,
        db: DatabaseConnection,
    ) -> Self {
        Self {
            consumers: Arc::new(consumers),
            verifier,
            course_contexts: CourseContextRepository::new(db),
        }
    }

    /// Registry from `lti.consumers`, HMAC-SHA1 verifier using the configured
    /// timestamp window.
    pub fn from_config(config: &AppConfig, db: DatabaseConnection) -> Result<Self, ConfigError> {
        let consumers = ConsumerRegistry::from_config(config)?;
        tracing::info!(consumers = consumers.len(), "Loaded LTI consumers");
        Ok(Self::new(
            consumers,
            Arc::new(HmacSha1Verifier::new(config.lti.timestamp_threshold)),
            db,
        ))
    }

    pub fn consumers(&self) -> &ConsumerRegistry {
        &self.consumers
    }

    pub fn course_contexts(&self) -> &CourseContextRepository {
        &self.course_contexts
    }

    pub fn launch(&self, request_type: RequestType, role_type: RoleType) -> LtiLaunch {
        LtiLaunch {
            request_type,
            role_type,
            params: None,
            context: self.clone(),
        }
    }
}

/// Verification state for a single request.
pub struct LtiLaunch {
    request_type: RequestType,
    role_type: RoleType,
    params: Option<LaunchParameters>,
    context: LtiContext,
}

impl LtiLaunch {
    pub fn request_type(&self) -> RequestType {
        self.request_type
    }

    /// Role the surrounding handler requires. Not enforced by [`Self::verify`];
    /// see [`Self::check_role`].
    pub fn role_type(&self) -> RoleType {
        self.role_type
    }

    pub fn consumers(&self) -> &ConsumerRegistry {
        self.context.consumers()
    }

    pub fn params(&self) -> Option<&LaunchParameters> {
        self.params.as_ref()
    }

    /// Replaces the launch parameters, e.g. when restoring them from storage.
    pub fn set_params(&mut self, params: LaunchParameters) {
        self.params = Some(params);
    }

    pub fn clear_params(&mut self) {
        self.params = None;
    }

    /// Runs the check for this launch's [`RequestType`].
    ///
    /// Returns `Ok(true)` on success; every failure is an error. A failed
    /// signed launch clears the parameters and sets the session flag false.
    #[tracing::instrument(skip_all, fields(mode = %self.request_type, session = %request.session.id()))]
    pub fn verify(&mut self, request: &mut LaunchRequest) -> Result<bool, LtiError> {
        match self.request_type {
            RequestType::Session => Self::verify_session(&request.session)?,
            RequestType::Initial => self.verify_request(request)?,
            RequestType::Any => self.verify_any(request)?,
        }
        Ok(true)
    }

    fn verify_session(session: &Session) -> Result<(), LtiError> {
        if session.is_lti_authenticated() {
            Ok(())
        } else {
            Err(LtiError::NotInSession)
        }
    }

    fn verify_any(&mut self, request: &mut LaunchRequest) -> Result<(), LtiError> {
        match Self::verify_session(&request.session) {
            Err(LtiError::NotInSession) => {
                tracing::debug!("No LTI session, falling back to signed launch");
                self.verify_request(request)
            }
            other => other,
        }
    }

    fn verify_request(&mut self, request: &mut LaunchRequest) -> Result<(), LtiError> {
        let params = request.launch_parameters();
        match self.check_signature(request, &params) {
            Ok(()) => {
                tracing::info!(
                    consumer = params.oauth_consumer_key.as_deref().unwrap_or_default(),
                    user_id = params.user_id.as_deref().unwrap_or_default(),
                    "LTI launch verified"
                );
                self.params = Some(params);
                request.session.set_lti_authenticated(true);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "LTI launch rejected");
                self.params = None;
                request.session.set_lti_authenticated(false);
                Err(e.into())
            }
        }
    }

    fn check_signature(
        &self,
        request: &LaunchRequest,
        params: &LaunchParameters,
    ) -> Result<(), SignatureError> {
        let key = params
            .oauth_consumer_key
            .as_deref()
            .ok_or(SignatureError::MissingOAuthParameter("oauth_consumer_key"))?;
        let consumer = self.context.consumers.get(key)?;
        self.context.verifier.verify(request, consumer)
    }

    /// Consumer-scoped user id: `"{oauth_consumer_key}-student"`.
    pub fn consumer_user_id(&self) -> Result<String, LtiError> {
        let key = self
            .params
            .as_ref()
            .and_then(|p| p.oauth_consumer_key.as_deref())
            .ok_or(LtiError::MissingParameter("oauth_consumer_key"))?;
        Ok(format!("{key}-student"))
    }

    pub fn user_email(&self) -> Option<&str> {
        self.params
            .as_ref()
            .and_then(|p| p.lis_person_contact_email_primary.as_deref())
    }

    /// Full name, else the LMS `user_id`, else an empty string.
    pub fn user_fullname(&self) -> &str {
        self.params
            .as_ref()
            .and_then(|p| {
                p.lis_person_name_full
                    .as_deref()
                    .or(p.user_id.as_deref())
            })
            .unwrap_or("")
    }

    pub fn user_roles(&self) -> Vec<String> {
        self.params
            .as_ref()
            .map(LaunchParameters::role_list)
            .unwrap_or_default()
    }

    pub fn course_context_id(&self) -> Option<&str> {
        self.params.as_ref().and_then(|p| p.context_id.as_deref())
    }

    pub fn course_title(&self) -> Option<&str> {
        self.params.as_ref().and_then(|p| p.context_title.as_deref())
    }

    pub fn is_role(&self, role: RoleType) -> bool {
        role.permits(&self.user_roles())
    }

    /// Fails with [`LtiError::RoleMismatch`] unless the launch roles satisfy
    /// [`Self::role_type`].
    pub fn check_role(&self) -> Result<(), LtiError> {
        if self.is_role(self.role_type) {
            Ok(())
        } else {
            Err(LtiError::RoleMismatch(self.role_type.to_string()))
        }
    }

    /// Resolves `custom_course_context` to an enabled course context.
    pub async fn custom_course_context(&self) -> Result<lti_course_context::Model, LtiError> {
        let raw = self
            .params
            .as_ref()
            .and_then(|p| p.custom_course_context.as_deref())
            .ok_or(LtiError::MissingParameter("custom_course_context"))?;
        self.context.course_contexts.resolve(raw).await
    }

    /// Enabled course context bound to the launch's LMS `context_id`, if any.
    pub async fn lms_course_context(
        &self,
    ) -> Result<Option<lti_course_context::Model>, LtiError> {
        let context_id = self
            .course_context_id()
            .ok_or(LtiError::MissingParameter("context_id"))?;
        Ok(self
            .context
            .course_contexts
            .find_enabled_by_lms_context(context_id)
            .await?)
    }
}
