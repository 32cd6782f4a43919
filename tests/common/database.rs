//! Test database setup and management
#![allow(dead_code)]

use clubhouse::db::create_schema;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};
use std::ops::Deref;
use tempfile::TempDir;

/// A freshly created SQLite database with the full schema.
///
/// Each test gets its own file, so tests never share rows and can run in
/// parallel. The file is removed when this value is dropped.
pub struct TestDatabase {
    pub conn: DatabaseConnection,
    _dir: TempDir,
}

impl Deref for TestDatabase {
    type Target = DatabaseConnection;

    fn deref(&self) -> &DatabaseConnection {
        &self.conn
    }
}

/// Setup test database - create a throwaway file and build the schema in it.
pub async fn setup_test_database() -> Result<TestDatabase, DbErr> {
    let dir = tempfile::tempdir().map_err(|e| DbErr::Custom(e.to_string()))?;
    let path = dir.path().join("clubhouse_test.db");
    let url = format!("sqlite://{}?mode=rwc", path.display());

    let conn = Database::connect(&url).await?;
    create_schema(&conn).await?;

    Ok(TestDatabase { conn, _dir: dir })
}

/// Installs a trigger that makes every DELETE on `table` fail, so a
/// multi-step removal errors partway through.
pub async fn fail_deletes_on(db: &DatabaseConnection, table: &str) -> Result<(), DbErr> {
    db.execute(Statement::from_string(
        db.get_database_backend(),
        format!(
            "CREATE TRIGGER fail_{table}_delete BEFORE DELETE ON {table} \
             BEGIN SELECT RAISE(ABORT, 'deletes blocked'); END",
            table = table
        ),
    ))
    .await?;
    Ok(())
}
