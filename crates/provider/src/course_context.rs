//! Lookups against the `lti_course_context` table.

use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::entity::lti_course_context;
use crate::error::LtiError;

/// Read-only access to course contexts. Disabled rows are invisible.
#[derive(Clone, Debug)]
pub struct CourseContextRepository {
    db: DatabaseConnection,
}

impl CourseContextRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_enabled(
        &self,
        uuid: Uuid,
    ) -> Result<Option<lti_course_context::Model>, DbErr> {
        lti_course_context::Entity::find_by_id(uuid)
            .filter(lti_course_context::Column::Enable.eq(true))
            .one(&self.db)
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_enabled_by_lms_context(
        &self,
        context_id: &str,
    ) -> Result<Option<lti_course_context::Model>, DbErr> {
        lti_course_context::Entity::find()
            .filter(lti_course_context::Column::LmsCourseContext.eq(context_id))
            .filter(lti_course_context::Column::Enable.eq(true))
            .one(&self.db)
            .await
    }

    /// Parses `raw` as a UUID and resolves the enabled context it names.
    pub async fn resolve(&self, raw: &str) -> Result<lti_course_context::Model, LtiError> {
        let uuid = Uuid::parse_str(raw.trim()).map_err(|e| LtiError::InvalidFormat {
            field: "custom_course_context",
            reason: e.to_string(),
        })?;
        self.find_enabled(uuid)
            .await?
            .ok_or_else(|| LtiError::NotFound(format!("Course context {uuid}")))
    }
}
