//! Fragments from PostgreSQL

use buildkg_domain::{Fragment, FragmentQuery, FragmentSource, MIN_EXCERPT_CHARS};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::debug;

use crate::StoreError;

/// Build the selection query for `query`.
///
/// The jurisdiction, when present, is bound as `$1`; limit and offset follow
/// as the next placeholders.
pub fn fragment_query_sql(query: &FragmentQuery) -> String {
    let mut sql = format!(
        "SELECT sf.fragment_id::text AS fragment_id, \
                sf.doc_id::text AS doc_id, \
                sf.canonical_locator::text AS canonical_locator, \
                sf.excerpt, \
                sf.jurisdiction::text AS jurisdiction, \
                sf.authority::text AS authority \
         FROM source_fragment sf \
         JOIN source_document sd ON sf.doc_id = sd.doc_id \
         WHERE sf.excerpt IS NOT NULL \
           AND LENGTH(sf.excerpt) > {}",
        MIN_EXCERPT_CHARS
    );

    let mut next = 1;
    if query.jurisdiction.is_some() {
        sql.push_str(&format!(" AND sf.jurisdiction = ${}", next));
        next += 1;
    }
    sql.push_str(" ORDER BY sf.created_at");
    if query.limit.is_some() {
        sql.push_str(&format!(" LIMIT ${} OFFSET ${}", next, next + 1));
    } else if query.offset > 0 {
        sql.push_str(&format!(" OFFSET ${}", next));
    }
    sql
}

/// Reads fragments from the `source_fragment` table.
///
/// Connections are opened lazily on the first fetch.
#[derive(Debug, Clone)]
pub struct PgFragmentSource {
    pool: PgPool,
}

impl PgFragmentSource {
    /// Create a source; the connection is made on the first fetch.
    pub fn new(options: PgConnectOptions) -> Self {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_lazy_with(options);
        Self { pool }
    }

    /// Create a source for a PostgreSQL connection URL.
    ///
    /// Fails only if the URL cannot be parsed.
    pub fn from_url(database_url: &str) -> Result<Self, StoreError> {
        Ok(Self::new(database_url.parse()?))
    }

    /// Close the pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn to_i64(value: usize) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::InvalidData(format!("{} is out of range", value)))
}

fn row_to_fragment(row: &PgRow) -> Result<Fragment, StoreError> {
    Ok(Fragment {
        fragment_id: row.try_get("fragment_id")?,
        doc_id: row.try_get("doc_id")?,
        excerpt: row.try_get("excerpt")?,
        canonical_locator: row.try_get("canonical_locator")?,
        authority: row.try_get("authority")?,
        jurisdiction: row.try_get("jurisdiction")?,
    })
}

impl FragmentSource for PgFragmentSource {
    type Error = StoreError;

    async fn fetch(&self, query: &FragmentQuery) -> Result<Vec<Fragment>, StoreError> {
        let sql = fragment_query_sql(query);
        debug!("Fetching fragments: {}", sql);

        let mut statement = sqlx::query(&sql);
        if let Some(jurisdiction) = &query.jurisdiction {
            statement = statement.bind(jurisdiction.clone());
        }
        if let Some(limit) = query.limit {
            statement = statement.bind(to_i64(limit)?).bind(to_i64(query.offset)?);
        } else if query.offset > 0 {
            statement = statement.bind(to_i64(query.offset)?);
        }

        let rows = statement.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_fragment).collect()
    }
}
