use std::time::Duration;

use sea_orm::sea_query::{Alias, ColumnDef, Table};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema};

use crate::entities::{account, blacklist, character, house};
use crate::models::LogCategory;

pub async fn connect(url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opts = ConnectOptions::new(url.to_owned());
    opts.max_connections(10)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    let db = Database::connect(opts).await?;
    tracing::info!("Connected to {:?} database", db.get_database_backend());
    Ok(db)
}

/// Creates any missing table the panel touches. Production databases are
/// owned by the game server; this is for fresh dev and test databases.
pub async fn bootstrap_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut tables = vec![
        schema.create_table_from_entity(account::Entity),
        schema.create_table_from_entity(character::Entity),
        schema.create_table_from_entity(blacklist::Entity),
        schema.create_table_from_entity(house::Entity),
    ];
    for category in LogCategory::ALL {
        tables.push(
            Table::create()
                .table(Alias::new(category.table()))
                .col(
                    ColumnDef::new(Alias::new("ID"))
                        .integer()
                        .not_null()
                        .auto_increment()
                        .primary_key(),
                )
                .col(ColumnDef::new(Alias::new("Text")).text().not_null())
                .col(ColumnDef::new(Alias::new("Date")).string().not_null())
                .col(ColumnDef::new(Alias::new("IP")).string().not_null())
                .to_owned(),
        );
    }

    for stmt in tables.iter_mut() {
        stmt.if_not_exists();
        db.execute(backend.build(&*stmt)).await?;
    }
    tracing::info!("Schema bootstrap complete");
    Ok(())
}
