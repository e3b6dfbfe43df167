//! PostgreSQL implementation of the link repository.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::domain::entities::{DeleteRequest, ShortLink, Stats};
use crate::domain::repositories::{LinkRepository, ensure_distinct_urls};
use crate::error::AppError;

/// Keeps each tombstone statement well under the bind parameter limit. All
/// chunks of one batch share a transaction.
const DELETE_CHUNK_SIZE: usize = 1000;

#[derive(Debug, sqlx::FromRow)]
struct LinkRow {
    code: String,
    url: String,
    owner: Option<String>,
    deleted: bool,
}

impl From<LinkRow> for ShortLink {
    fn from(row: LinkRow) -> Self {
        ShortLink {
            code: row.code,
            url: row.url,
            owner: row.owner.unwrap_or_default(),
            deleted: row.deleted,
        }
    }
}

/// PostgreSQL repository for link storage and retrieval.
///
/// Deduplication is checked with a locking read before every insert and backed
/// by a partial unique index, so two racing inserts of one url cannot both win.
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
}

impl PgLinkRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Connects to `dsn` and applies the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::BackendUnavailable`] if the database cannot be reached
    /// or the schema cannot be created.
    pub async fn connect(
        dsn: &str,
        max_connections: u32,
        connect_timeout: Duration,
    ) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(connect_timeout)
            .connect(dsn)
            .await
            .map_err(|e| AppError::from(e).context("failed to connect to database"))?;
        info!("Connected to database");

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database schema is up to date");

        Ok(Self::new(Arc::new(pool)))
    }
}

async fn find_live_by_url(
    conn: &mut PgConnection,
    url: &str,
) -> Result<Option<ShortLink>, AppError> {
    let row = sqlx::query_as::<_, LinkRow>(
        r#"
        SELECT code, url, owner, deleted
        FROM shortener
        WHERE url = $1 AND NOT deleted
        FOR UPDATE
        "#,
    )
    .bind(url)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(ShortLink::from))
}

/// Dedup check followed by the insert, on one connection.
///
/// The insert ignores conflicts on both the code and the live url index. When
/// nothing was written the url is looked up again: a live row means another
/// writer stored the url first, otherwise the code was taken.
async fn insert_link(conn: &mut PgConnection, link: &ShortLink) -> Result<(), AppError> {
    if let Some(existing) = find_live_by_url(conn, &link.url).await? {
        return Err(AppError::already_exists(existing));
    }

    let inserted = sqlx::query(
        r#"
        INSERT INTO shortener (code, url, owner)
        VALUES ($1, $2, $3)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(&link.code)
    .bind(&link.url)
    .bind(owner_column(&link.owner))
    .execute(&mut *conn)
    .await?;

    if inserted.rows_affected() > 0 {
        return Ok(());
    }

    match find_live_by_url(conn, &link.url).await? {
        Some(existing) => Err(AppError::already_exists(existing)),
        None => Err(AppError::CodeCollision {
            code: link.code.clone(),
        }),
    }
}

fn owner_column(owner: &str) -> Option<&str> {
    (!owner.is_empty()).then_some(owner)
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn get(&self, code: &str) -> Result<ShortLink, AppError> {
        let row = sqlx::query_as::<_, LinkRow>(
            "SELECT code, url, owner, deleted FROM shortener WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        match row {
            None => Err(AppError::not_found(code)),
            Some(row) if row.deleted => Err(AppError::gone(code)),
            Some(row) => Ok(row.into()),
        }
    }

    async fn set(&self, link: ShortLink) -> Result<ShortLink, AppError> {
        let mut conn = self.pool.acquire().await?;
        insert_link(&mut conn, &link).await?;

        debug!(code = %link.code, "Inserted short link");
        Ok(link)
    }

    async fn set_batch(&self, links: Vec<ShortLink>) -> Result<Vec<ShortLink>, AppError> {
        if links.is_empty() {
            return Ok(links);
        }
        ensure_distinct_urls(&links)?;

        let mut tx = self.pool.begin().await?;
        for link in &links {
            if let Err(e) = insert_link(&mut tx, link).await {
                tx.rollback().await?;
                return Err(e);
            }
        }
        tx.commit().await?;

        debug!(rows = links.len(), "Inserted short link batch");
        Ok(links)
    }

    async fn get_batch_by_owner(&self, owner: &str) -> Result<Vec<ShortLink>, AppError> {
        let rows = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT code, url, owner, deleted
            FROM shortener
            WHERE NOT deleted AND ($1 = '' OR owner = $1)
            ORDER BY code
            "#,
        )
        .bind(owner)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(ShortLink::from).collect())
    }

    async fn delete_batch(&self, requests: Vec<DeleteRequest>) -> Result<(), AppError> {
        if requests.is_empty() {
            return Ok(());
        }

        let mut deleted = 0u64;
        let mut tx = self.pool.begin().await?;

        for chunk in requests.chunks(DELETE_CHUNK_SIZE) {
            let mut query: QueryBuilder<Postgres> =
                QueryBuilder::new("UPDATE shortener AS s SET deleted = TRUE FROM (");
            query.push_values(chunk, |mut row, request| {
                row.push_bind(&request.code).push_bind(&request.owner);
            });
            query.push(
                ") AS k(code, owner) WHERE s.code = k.code AND s.owner = k.owner AND NOT s.deleted",
            );

            deleted += query
                .build()
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        tx.commit().await?;

        debug!(
            requested = requests.len(),
            deleted, "Tombstoned short links"
        );
        Ok(())
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await
            .map_err(|e| AppError::from(e).context("database ping failed"))?;
        Ok(())
    }

    async fn stats(&self) -> Result<Stats, AppError> {
        let (urls, users): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(DISTINCT url), COUNT(DISTINCT COALESCE(owner, ''))
            FROM shortener
            WHERE NOT deleted
            "#,
        )
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(Stats {
            url_count: u64::try_from(urls).unwrap_or_default(),
            user_count: u64::try_from(users).unwrap_or_default(),
        })
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
