//! Database pool and schema bootstrap.

use crate::orm::{clubs, members, poll_options, poll_votes, polls, proposal_votes, proposals, users};
use once_cell::sync::OnceCell;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema, Statement};

static DB_POOL: OnceCell<DatabaseConnection> = OnceCell::new();

/// Returns the global connection pool.
/// Panics if `init_db` has not completed.
pub fn get_db_pool() -> &'static DatabaseConnection {
    DB_POOL.get().expect("DB_POOL accessed before init_db")
}

/// Connects to `database_url` and stores the pool globally.
pub async fn init_db(database_url: String) -> Result<&'static DatabaseConnection, DbErr> {
    let db = Database::connect(&database_url).await?;
    log::info!("Connected to {:?} database", db.get_database_backend());

    if DB_POOL.set(db).is_err() {
        log::warn!("init_db called twice; keeping the first connection pool");
    }

    Ok(get_db_pool())
}

/// Unique constraints the voting and membership rules depend on.
/// Created after the tables so they also apply to pre-existing tables.
const UNIQUE_INDEXES: [(&str, &str, &str); 3] = [
    ("uq_members_user_club", "members", "user_id, club_id"),
    ("uq_poll_votes_poll_user", "poll_votes", "poll_id, user_id"),
    ("uq_proposal_votes_proposal_user", "proposal_votes", "proposal_id, user_id"),
];

/// Creates every table and unique index that does not already exist.
/// Tables are created parents first so foreign keys resolve.
pub async fn create_schema<C>(db: &C) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    create_table(db, &schema, users::Entity).await?;
    create_table(db, &schema, clubs::Entity).await?;
    create_table(db, &schema, members::Entity).await?;
    create_table(db, &schema, polls::Entity).await?;
    create_table(db, &schema, poll_options::Entity).await?;
    create_table(db, &schema, poll_votes::Entity).await?;
    create_table(db, &schema, proposals::Entity).await?;
    create_table(db, &schema, proposal_votes::Entity).await?;

    for (name, table, columns) in UNIQUE_INDEXES {
        db.execute(Statement::from_string(
            backend,
            format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({})",
                name, table, columns
            ),
        ))
        .await?;
    }

    Ok(())
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

/// True when `err` is the store rejecting a row that breaks a unique index.
///
/// sea-orm surfaces driver errors as text, so this matches the messages of
/// the backends we support.
pub fn is_unique_violation(err: &DbErr) -> bool {
    let msg = match err {
        DbErr::Exec(msg) | DbErr::Query(msg) | DbErr::Conn(msg) => msg,
        _ => return false,
    };

    msg.contains("UNIQUE constraint failed")
        || msg.contains("duplicate key value violates unique constraint")
        || msg.contains("Duplicate entry")
}
