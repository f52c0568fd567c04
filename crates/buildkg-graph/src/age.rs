//! Apache AGE graph store over PostgreSQL

use buildkg_domain::{GraphMutation, GraphStore};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, Executor};
use tracing::{debug, info};

use crate::cypher::{render_statement, sanitize_identifier};
use crate::error::GraphError;

const AGE_SESSION_SETUP: &str = "LOAD 'age'; SET search_path = ag_catalog, \"$user\", public;";

/// Graph store that executes Cypher through the AGE extension.
///
/// The connection is opened on first use. Each fragment's mutations run in
/// one transaction.
pub struct AgeGraphStore {
    options: PgConnectOptions,
    graph_name: String,
    conn: Option<PgConnection>,
}

impl AgeGraphStore {
    /// Create a store; no connection is made until the first write.
    pub fn new(options: PgConnectOptions, graph_name: impl Into<String>) -> Self {
        Self {
            options,
            graph_name: sanitize_identifier(&graph_name.into()),
            conn: None,
        }
    }

    /// Target graph
    pub fn graph_name(&self) -> &str {
        &self.graph_name
    }

    async fn connection(&mut self) -> Result<&mut PgConnection, GraphError> {
        if self.conn.is_none() {
            debug!("Connecting to PostgreSQL for graph '{}'", self.graph_name);
            let mut conn = PgConnection::connect_with(&self.options).await?;
            conn.execute(sqlx::raw_sql(AGE_SESSION_SETUP)).await?;
            self.conn = Some(conn);
        }
        self.conn
            .as_mut()
            .ok_or_else(|| GraphError::Config("connection unavailable".to_string()))
    }

    /// Whether the graph exists in `ag_catalog.ag_graph`
    pub async fn graph_exists(&mut self) -> Result<bool, GraphError> {
        let name = self.graph_name.clone();
        let conn = self.connection().await?;
        let count: i64 =
            sqlx::query_scalar("SELECT count(*) FROM ag_catalog.ag_graph WHERE name = $1")
                .bind(name)
                .fetch_one(conn)
                .await?;
        Ok(count > 0)
    }

    /// Create the graph if it does not exist yet
    pub async fn ensure_graph(&mut self) -> Result<(), GraphError> {
        if self.graph_exists().await? {
            return Ok(());
        }
        let statement = format!("SELECT * FROM ag_catalog.create_graph('{}');", self.graph_name);
        let conn = self.connection().await?;
        conn.execute(sqlx::raw_sql(&statement)).await?;
        info!("Created graph '{}'", self.graph_name);
        Ok(())
    }
}

impl GraphStore for AgeGraphStore {
    type Error = GraphError;

    async fn execute(&mut self, mutation: &GraphMutation) -> Result<(), GraphError> {
        let statement = render_statement(&self.graph_name, mutation);
        let conn = self.connection().await?;
        conn.execute(sqlx::raw_sql(&statement))
            .await
            .map_err(|e| GraphError::Query(e.to_string()))?;
        Ok(())
    }

    async fn apply(&mut self, mutations: &[GraphMutation]) -> Result<(), GraphError> {
        let statements: Vec<String> = mutations
            .iter()
            .map(|m| render_statement(&self.graph_name, m))
            .collect();
        let conn = self.connection().await?;
        let mut tx = conn.begin().await?;
        for statement in &statements {
            tx.execute(sqlx::raw_sql(statement))
                .await
                .map_err(|e| GraphError::Query(e.to_string()))?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), GraphError> {
        if let Some(conn) = self.conn.take() {
            conn.close().await?;
            debug!("Closed graph connection");
        }
        Ok(())
    }
}
