//! Schema migration entity - Records which schema versions have been applied.

use sea_orm::entity::prelude::*;

/// Schema migration database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "schema_migrations")]
pub struct Model {
    /// Migration version, applied in ascending order
    #[sea_orm(primary_key, auto_increment = false)]
    pub version: i32,
    /// Short description of the migration
    pub name: String,
    /// When the migration ran
    pub applied_at: DateTimeUtc,
}

/// `SchemaMigration` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
