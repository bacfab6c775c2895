use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "blacklist")]
pub struct Model {
    #[sea_orm(primary_key, column_name = "ID")]
    pub id: i32,
    #[serde(skip_serializing)]
    #[sea_orm(column_name = "IP")]
    pub ip: String,
    #[sea_orm(column_name = "Username")]
    pub username: String,
    #[sea_orm(column_name = "BannedBy")]
    pub banned_by: String,
    #[sea_orm(column_name = "Reason")]
    pub reason: String,
    /// Permanent bans are issued in-game only. The panel writes 0 and clears it on unban.
    #[sea_orm(column_name = "perm")]
    pub perm: i32,
    #[sea_orm(column_name = "Date")]
    pub date: String,
    #[sea_orm(column_name = "Expire")]
    pub expire: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
