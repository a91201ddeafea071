//! LTI course context entity.
//!
//! Binds an LMS course (`context_id`) to the application's groups. Rows are
//! created disabled and must be enabled by an administrator before launches
//! can resolve them.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lti_course_context")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: Uuid,
    /// `context_id` of the course in the consumer LMS
    #[sea_orm(unique)]
    pub lms_course_context: Option<String>,
    /// Group every launched user of this course joins
    pub group_name: String,
    /// Group staff launches of this course join
    pub faculty_group_name: String,
    pub enable: bool,
    pub created_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
