//! Destination table creation.

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::spec::ImporterSpec;

/// Creates the destination table of an import.
///
/// Index statements from the spec are run by the importer after the creator,
/// whichever creator is used.
#[async_trait]
pub trait TableCreator: Send + Sync {
    async fn create_table(&self, pool: &SqlitePool, spec: &ImporterSpec)
        -> Result<(), sqlx::Error>;
}

/// `CREATE TABLE IF NOT EXISTS` built from the declared columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTableCreator;

#[async_trait]
impl TableCreator for DefaultTableCreator {
    async fn create_table(
        &self,
        pool: &SqlitePool,
        spec: &ImporterSpec,
    ) -> Result<(), sqlx::Error> {
        let sql = spec.create_table_sql();
        log::debug!("{}", sql);
        sqlx::query(&sql).execute(pool).await?;
        Ok(())
    }
}

/// Runs caller-supplied DDL (may hold several statements).
#[derive(Debug, Clone)]
pub struct SqlTableCreator {
    sql: String,
}

impl SqlTableCreator {
    pub fn new(sql: impl Into<String>) -> Self {
        SqlTableCreator { sql: sql.into() }
    }
}

#[async_trait]
impl TableCreator for SqlTableCreator {
    async fn create_table(
        &self,
        pool: &SqlitePool,
        spec: &ImporterSpec,
    ) -> Result<(), sqlx::Error> {
        log::debug!("Custom DDL for '{}': {}", spec.table_name, self.sql);
        sqlx::raw_sql(&self.sql).execute(pool).await?;
        Ok(())
    }
}
