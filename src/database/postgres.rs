use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use sqlx::{postgres::{PgArguments, PgPoolOptions}, FromRow, PgPool};
use tokio::sync::mpsc;
use tracing::info;

use super::models::{Book, NewBook};
use super::query::{BookQuery, SqlResult};
use super::store::{BookStore, BookStream, StoreError};
use crate::config::DatabaseConfig;

const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS "book" (
        "id"    BIGSERIAL PRIMARY KEY,
        "name"  TEXT,
        "owner" TEXT
    )
"#;

// Rows fetched ahead of the consumer
const ROW_BUFFER: usize = 16;

const INSERT_SQL: &str = r#"
    INSERT INTO "book" ("name", "owner")
    VALUES ($1, $2)
    RETURNING "id", "name", "owner"
"#;

/// Postgres-backed book store
#[derive(Clone)]
pub struct PgBookStore {
    pool: PgPool,
}

impl PgBookStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool from config. Fails when no database URL is configured.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = config
            .url
            .as_deref()
            .ok_or(StoreError::ConfigMissing("DATABASE_URL"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!("Connected book store pool (max {} connections)", config.max_connections);
        Ok(Self::new(pool))
    }

    /// Create the book table if it does not exist yet
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE_SQL).execute(&self.pool).await?;
        info!("Book table ready");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed book store pool");
    }
}

#[async_trait]
impl BookStore for PgBookStore {
    fn kind(&self) -> &'static str {
        "postgres"
    }

    async fn insert(&self, book: NewBook) -> Result<Book, StoreError> {
        let row = sqlx::query_as::<_, Book>(INSERT_SQL)
            .bind(book.name)
            .bind(book.owner)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    fn find(&self, query: &BookQuery) -> BookStream {
        let sql_result = query.to_sql();
        let pool = self.pool.clone();

        // The query starts on first poll
        stream::once(async move { spawn_row_reader(pool, sql_result) })
            .flat_map(|rx| stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|row| (row, rx)) }))
            .boxed()
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

/// Run the query in its own task and hand rows over a bounded channel. The
/// row cursor borrows the pool and the SQL text, so both live in the task.
/// A failed send means the consumer dropped the stream.
fn spawn_row_reader(pool: PgPool, sql_result: SqlResult) -> mpsc::Receiver<Result<Book, StoreError>> {
    let (tx, rx) = mpsc::channel(ROW_BUFFER);

    tokio::spawn(async move {
        let SqlResult { query, params } = sql_result;
        tracing::debug!("Executing book query: {}", query);

        let mut q = sqlx::query_as::<_, Book>(&query);
        for p in params.iter() {
            q = match bind_param_query_as(q, p) {
                Ok(q) => q,
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            };
        }

        let mut rows = q.fetch(&pool);
        while let Some(row) = rows.next().await {
            if tx.send(row.map_err(StoreError::from)).await.is_err() {
                tracing::debug!("Book stream dropped before the last row");
                break;
            }
        }
    });

    rx
}

fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &'q Value,
) -> Result<sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>, StoreError>
where
    O: for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    match v {
        Value::Null => {
            let none: Option<String> = None;
            Ok(q.bind(none))
        }
        Value::Bool(b) => Ok(q.bind(*b)),
        Value::String(s) => Ok(q.bind(s.as_str())),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(q.bind(i)),
            None => Err(StoreError::QueryError(format!("unsupported numeric parameter: {}", n))),
        },
        Value::Array(_) | Value::Object(_) => {
            Err(StoreError::QueryError("composite parameters are not supported".to_string()))
        }
    }
}
