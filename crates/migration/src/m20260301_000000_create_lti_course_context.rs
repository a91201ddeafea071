use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Course contexts binding LMS courses to application groups
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LtiCourseContext::Table)
                    .if_not_exists()
                    .col(uuid(LtiCourseContext::Uuid).primary_key())
                    .col(
                        string_null(LtiCourseContext::LmsCourseContext)
                            .unique_key()
                            .comment("context_id of the course in the consumer LMS"),
                    )
                    .col(string(LtiCourseContext::GroupName))
                    .col(string(LtiCourseContext::FacultyGroupName))
                    .col(boolean(LtiCourseContext::Enable).default(false))
                    .col(
                        timestamp_with_time_zone(LtiCourseContext::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_lti_course_context_enable")
                    .table(LtiCourseContext::Table)
                    .col(LtiCourseContext::Enable)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LtiCourseContext::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum LtiCourseContext {
    Table,
    Uuid,
    LmsCourseContext,
    GroupName,
    FacultyGroupName,
    Enable,
    CreatedAt,
}
