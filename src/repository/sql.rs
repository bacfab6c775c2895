use async_trait::async_trait;
use sea_orm::sea_query::{Alias, Expr, Order, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbErr, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};

use super::{NewAccount, NewBan, NewCharacter, RepoError, RepoResult, Repository, StaffRow};
use crate::entities::{account, blacklist, character, house};
use crate::models::{
    AccountStats, BanEntry, CharacterData, CharacterRef, CharacterStats, LogCategory, LogRecord,
    ServerStats, MAX_CHARACTERS,
};

/// `Repository` over the game server's SQL schema.
#[derive(Clone)]
pub struct SqlRepository {
    db: DatabaseConnection,
}

impl SqlRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_datetime(secs: i64) -> sea_orm::prelude::DateTime {
    chrono::DateTime::from_timestamp(secs, 0)
        .unwrap_or_default()
        .naive_utc()
}

fn insert_error(err: DbErr) -> RepoError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => RepoError::Duplicate,
        _ => RepoError::Db(err),
    }
}

fn affected(rows: u64) -> RepoResult<()> {
    if rows == 0 {
        Err(RepoError::NoRows)
    } else {
        Ok(())
    }
}

async fn abort(txn: DatabaseTransaction, err: RepoError) -> RepoError {
    if let Err(e) = txn.rollback().await {
        tracing::error!("Failed to roll back transaction: {e}");
    }
    err
}

fn active_ban(now: i64) -> Condition {
    Condition::any()
        .add(blacklist::Column::Perm.eq(1))
        .add(blacklist::Column::Expire.gt(to_datetime(now)))
}

#[async_trait]
impl Repository for SqlRepository {
    async fn account_exists(&self, username: &str, email: &str) -> RepoResult<bool> {
        let count = account::Entity::find()
            .filter(
                Condition::any()
                    .add(account::Column::Username.eq(username))
                    .add(account::Column::Email.eq(email)),
            )
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn create_account(&self, new: NewAccount) -> RepoResult<()> {
        account::ActiveModel {
            username: Set(new.username),
            email: Set(new.email),
            password: Set(new.password_digest),
            register_date: Set(new.register_date),
            login_date: Set(0),
            ip: Set(String::new()),
            activated: Set(account::PENDING),
            admin: Set(0),
            tester: Set(0),
            donate_rank: Set(0),
            characters: Set(0),
            accepted_by: Set(String::new()),
            accepted: Set(0),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(insert_error)?;
        Ok(())
    }

    async fn discard_pending_account(&self, username: &str) -> RepoResult<()> {
        let res = account::Entity::delete_many()
            .filter(account::Column::Username.eq(username))
            .filter(account::Column::Activated.eq(account::PENDING))
            .exec(&self.db)
            .await?;
        affected(res.rows_affected)
    }

    async fn set_activation(&self, email: &str) -> RepoResult<()> {
        let res = account::Entity::update_many()
            .col_expr(account::Column::Activated, Expr::value(account::ACTIVATED))
            .filter(account::Column::Email.eq(email))
            .filter(account::Column::Activated.eq(account::PENDING))
            .exec(&self.db)
            .await?;
        affected(res.rows_affected)
    }

    async fn activation(&self, username: &str) -> RepoResult<Option<i32>> {
        Ok(account::Entity::find()
            .filter(account::Column::Username.eq(username))
            .one(&self.db)
            .await?
            .map(|a| a.activated))
    }

    async fn activation_by_email(&self, email: &str) -> RepoResult<Option<i32>> {
        Ok(account::Entity::find()
            .filter(account::Column::Email.eq(email))
            .one(&self.db)
            .await?
            .map(|a| a.activated))
    }

    async fn password_digest(&self, username: &str) -> RepoResult<Option<String>> {
        Ok(account::Entity::find()
            .filter(account::Column::Username.eq(username))
            .one(&self.db)
            .await?
            .map(|a| a.password))
    }

    async fn update_password(&self, email: &str, digest: &str) -> RepoResult<()> {
        let res = account::Entity::update_many()
            .col_expr(account::Column::Password, Expr::value(digest))
            .filter(account::Column::Email.eq(email))
            .exec(&self.db)
            .await?;
        affected(res.rows_affected)
    }

    async fn role_flags(&self, username: &str) -> RepoResult<(i32, i32)> {
        account::Entity::find()
            .filter(account::Column::Username.eq(username))
            .one(&self.db)
            .await?
            .map(|a| (a.admin, a.tester))
            .ok_or(RepoError::NoRows)
    }

    async fn account_email(&self, username: &str) -> RepoResult<Option<String>> {
        Ok(account::Entity::find()
            .filter(account::Column::Username.eq(username))
            .one(&self.db)
            .await?
            .map(|a| a.email))
    }

    async fn account_ip(&self, username: &str) -> RepoResult<Option<String>> {
        Ok(account::Entity::find()
            .filter(account::Column::Username.eq(username))
            .one(&self.db)
            .await?
            .map(|a| a.ip)
            .filter(|ip| !ip.is_empty()))
    }

    async fn character_count(&self, owner: &str) -> RepoResult<u64> {
        Ok(character::Entity::find()
            .filter(character::Column::Username.eq(owner))
            .filter(character::Column::Created.gte(character::PROPOSED))
            .count(&self.db)
            .await?)
    }

    async fn character_name_taken(&self, name: &str) -> RepoResult<bool> {
        let count = character::Entity::find()
            .filter(character::Column::Character.eq(name))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn create_character(&self, new: NewCharacter) -> RepoResult<()> {
        character::ActiveModel {
            username: Set(new.owner),
            character: Set(new.name),
            level: Set(1),
            created: Set(character::PROPOSED),
            age: Set(new.age),
            gender: Set(new.gender),
            origin: Set(new.origin),
            skin: Set(new.skin),
            status: Set(0),
            accepted_by: Set(String::new()),
            online: Set(0),
            playing_hours: Set(0),
            jail_time: Set(0),
            prisoned: Set(0),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(insert_error)?;
        Ok(())
    }

    async fn proposed_characters(&self) -> RepoResult<Vec<CharacterData>> {
        let rows = character::Entity::find()
            .filter(character::Column::Created.eq(character::PROPOSED))
            .order_by_asc(character::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|c| CharacterData {
                username: c.username,
                character_name: c.character,
                character_age: c.age,
                character_gender: c.gender,
                character_origin: c.origin,
            })
            .collect())
    }

    async fn accept_character(&self, owner: &str, name: &str, reviewer: &str) -> RepoResult<()> {
        let txn = self.db.begin().await?;

        let res = character::Entity::update_many()
            .col_expr(character::Column::Created, Expr::value(character::ACCEPTED))
            .col_expr(character::Column::Status, Expr::value(1))
            .col_expr(character::Column::AcceptedBy, Expr::value(reviewer))
            .filter(character::Column::Character.eq(name))
            .filter(character::Column::Username.eq(owner))
            .filter(character::Column::Created.eq(character::PROPOSED))
            .exec(&txn)
            .await;
        match res {
            Ok(r) if r.rows_affected > 0 => {}
            Ok(_) => return Err(abort(txn, RepoError::NoRows).await),
            Err(e) => return Err(abort(txn, e.into()).await),
        }

        let res = account::Entity::update_many()
            .col_expr(
                account::Column::Characters,
                Expr::col(account::Column::Characters).add(1),
            )
            .col_expr(account::Column::AcceptedBy, Expr::value(reviewer))
            .col_expr(account::Column::Accepted, Expr::value(2))
            .filter(account::Column::Username.eq(owner))
            .filter(account::Column::Characters.lt(MAX_CHARACTERS))
            .exec(&txn)
            .await;
        match res {
            Ok(r) if r.rows_affected > 0 => {}
            Ok(_) => return Err(abort(txn, RepoError::NoRows).await),
            Err(e) => return Err(abort(txn, e.into()).await),
        }

        txn.commit().await?;
        Ok(())
    }

    async fn delete_proposed_character(&self, owner: &str, name: &str) -> RepoResult<()> {
        let res = character::Entity::delete_many()
            .filter(character::Column::Character.eq(name))
            .filter(character::Column::Username.eq(owner))
            .filter(character::Column::Created.eq(character::PROPOSED))
            .exec(&self.db)
            .await?;
        affected(res.rows_affected)
    }

    async fn find_character(&self, name: &str) -> RepoResult<Option<CharacterRef>> {
        Ok(character::Entity::find()
            .filter(character::Column::Character.eq(name))
            .one(&self.db)
            .await?
            .map(|c| CharacterRef {
                username: c.username,
                character_name: c.character,
            }))
    }

    async fn jail_character(&self, name: &str, seconds: i32) -> RepoResult<()> {
        let res = character::Entity::update_many()
            .col_expr(character::Column::JailTime, Expr::value(seconds))
            .col_expr(character::Column::Prisoned, Expr::value(0))
            .filter(character::Column::Character.eq(name))
            .exec(&self.db)
            .await?;
        affected(res.rows_affected)
    }

    async fn purge_expired_characters(&self) -> RepoResult<u64> {
        let res = character::Entity::delete_many()
            .filter(character::Column::Created.eq(character::EXPIRED))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected)
    }

    async fn is_banned(&self, username: &str, now: i64) -> RepoResult<bool> {
        let count = blacklist::Entity::find()
            .filter(blacklist::Column::Username.eq(username))
            .filter(active_ban(now))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn insert_ban(&self, ban: NewBan) -> RepoResult<()> {
        blacklist::ActiveModel {
            ip: Set(ban.ip),
            username: Set(ban.username),
            banned_by: Set(ban.banned_by),
            reason: Set(ban.reason),
            perm: Set(0),
            date: Set(ban.date),
            expire: Set(to_datetime(ban.expires_at)),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        Ok(())
    }

    async fn deactivate_ban(&self, username: &str, now: i64) -> RepoResult<()> {
        let res = blacklist::Entity::update_many()
            .col_expr(blacklist::Column::Expire, Expr::value(to_datetime(now - 1)))
            .col_expr(blacklist::Column::Perm, Expr::value(0))
            .filter(blacklist::Column::Username.eq(username))
            .filter(active_ban(now))
            .exec(&self.db)
            .await?;
        affected(res.rows_affected)
    }

    async fn active_bans(&self, now: i64) -> RepoResult<Vec<BanEntry>> {
        let bans = blacklist::Entity::find()
            .filter(active_ban(now))
            .order_by_desc(blacklist::Column::Expire)
            .all(&self.db)
            .await?;

        let mut entries = Vec::with_capacity(bans.len());
        for ban in bans {
            let characters: Vec<String> = character::Entity::find()
                .select_only()
                .column(character::Column::Character)
                .filter(character::Column::Username.eq(&ban.username))
                .filter(character::Column::Created.eq(character::ACCEPTED))
                .into_tuple()
                .all(&self.db)
                .await?;
            entries.push(BanEntry {
                username: ban.username,
                admin: ban.banned_by,
                reason: ban.reason,
                expire: ban.expire.format("%Y-%m-%d %H:%M:%S").to_string(),
                characters,
            });
        }
        Ok(entries)
    }

    async fn account_stats(&self, username: &str) -> RepoResult<Option<AccountStats>> {
        let Some(acc) = account::Entity::find()
            .filter(account::Column::Username.eq(username))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let character_list: Vec<CharacterStats> = character::Entity::find()
            .filter(character::Column::Username.eq(username))
            .filter(character::Column::Created.gte(character::PROPOSED))
            .order_by_asc(character::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|c| CharacterStats {
                character_name: c.character,
                character_status: c.created,
                character_level: c.level,
                playing_hours: c.playing_hours,
            })
            .collect();

        Ok(Some(AccountStats {
            username: acc.username,
            admin: acc.admin,
            tester: acc.tester,
            donate_rank: acc.donate_rank,
            characters: character_list.len() as i32,
            last_login: acc.login_date,
            character_list,
        }))
    }

    async fn staff(&self) -> RepoResult<Vec<StaffRow>> {
        let rows = account::Entity::find()
            .filter(
                Condition::any()
                    .add(account::Column::Admin.gt(0))
                    .add(account::Column::Tester.gt(0)),
            )
            .all(&self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|a| StaffRow {
                username: a.username,
                admin: a.admin,
                tester: a.tester,
            })
            .collect())
    }

    async fn server_stats(&self, now: i64) -> RepoResult<ServerStats> {
        let players_online = character::Entity::find()
            .filter(character::Column::Online.eq(1))
            .count(&self.db)
            .await?;
        let total_bans = blacklist::Entity::find()
            .filter(active_ban(now))
            .count(&self.db)
            .await?;
        let total_houses = house::Entity::find().count(&self.db).await?;
        let total_staff = account::Entity::find()
            .filter(
                Condition::any()
                    .add(account::Column::Admin.gt(0))
                    .add(account::Column::Tester.gt(0)),
            )
            .count(&self.db)
            .await?;
        let total_accounts = account::Entity::find()
            .filter(account::Column::Activated.eq(account::ACTIVATED))
            .count(&self.db)
            .await?;
        let total_characters = character::Entity::find()
            .filter(character::Column::Created.eq(character::ACCEPTED))
            .count(&self.db)
            .await?;

        Ok(ServerStats {
            players_online,
            total_bans,
            total_houses,
            total_staff,
            total_accounts,
            total_characters,
        })
    }

    async fn recent_logs(&self, category: LogCategory, limit: u64) -> RepoResult<Vec<LogRecord>> {
        let stmt = Query::select()
            .expr_as(Expr::col(Alias::new("ID")), Alias::new("id"))
            .expr_as(Expr::col(Alias::new("Text")), Alias::new("text"))
            .expr_as(Expr::col(Alias::new("Date")), Alias::new("date"))
            .from(Alias::new(category.table()))
            .order_by(Alias::new("ID"), Order::Desc)
            .limit(limit)
            .to_owned();
        let backend = self.db.get_database_backend();
        Ok(LogRecord::find_by_statement(backend.build(&stmt))
            .all(&self.db)
            .await?)
    }
}
