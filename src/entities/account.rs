use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Activation value written once the email address has been confirmed.
pub const ACTIVATED: i32 = 2;
pub const PENDING: i32 = 0;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, column_name = "ID")]
    pub id: i32,
    #[sea_orm(unique, column_name = "Username")]
    pub username: String,
    #[sea_orm(unique, column_name = "Email")]
    pub email: String,
    #[serde(skip_serializing)]
    #[sea_orm(column_name = "Password")]
    pub password: String,
    #[sea_orm(column_name = "RegisterDate")]
    pub register_date: String,
    #[sea_orm(column_name = "LoginDate")]
    pub login_date: i64,
    #[sea_orm(column_name = "IP")]
    pub ip: String,
    #[sea_orm(column_name = "Activated")]
    pub activated: i32,
    #[sea_orm(column_name = "Admin")]
    pub admin: i32,
    #[sea_orm(column_name = "Tester")]
    pub tester: i32,
    #[sea_orm(column_name = "DonateRank")]
    pub donate_rank: i32,
    #[sea_orm(column_name = "Characters")]
    pub characters: i32,
    #[sea_orm(column_name = "AcceptedBy")]
    pub accepted_by: String,
    #[sea_orm(column_name = "Accepted")]
    pub accepted: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
