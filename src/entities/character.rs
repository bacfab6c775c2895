use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Values of the `Created` column.
pub const PROPOSED: i32 = 0;
pub const ACCEPTED: i32 = 1;
pub const EXPIRED: i32 = -1;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "characters")]
pub struct Model {
    #[sea_orm(primary_key, column_name = "ID")]
    pub id: i32,
    #[sea_orm(column_name = "Username")]
    pub username: String,
    #[sea_orm(unique, column_name = "Character")]
    pub character: String,
    #[sea_orm(column_name = "Level")]
    pub level: i32,
    #[sea_orm(column_name = "Created")]
    pub created: i32,
    #[sea_orm(column_name = "Age")]
    pub age: i32,
    #[sea_orm(column_name = "Gender")]
    pub gender: i32,
    #[sea_orm(column_name = "Origin")]
    pub origin: String,
    #[sea_orm(column_name = "Skin")]
    pub skin: i32,
    #[sea_orm(column_name = "Status")]
    pub status: i32,
    #[sea_orm(column_name = "AcceptedBy")]
    pub accepted_by: String,
    #[sea_orm(column_name = "Online")]
    pub online: i32,
    #[sea_orm(column_name = "PlayingHours")]
    pub playing_hours: i32,
    #[sea_orm(column_name = "JailTime")]
    pub jail_time: i32,
    #[sea_orm(column_name = "Prisoned")]
    pub prisoned: i32,
}

// Owner is referenced by username only; the game schema carries no foreign key.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
