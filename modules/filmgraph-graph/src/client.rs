use async_trait::async_trait;
use neo4rs::{ConfigBuilder, Graph};

use crate::migrate;
use crate::plan::WritePlan;
use crate::reader::GraphReader;
use crate::schema::{NodeLabel, RelType, UniqueConstraint};
use crate::store::{FilmGraphStore, GraphStats, StoreError, WriteCounters};
use crate::writer::GraphWriter;

/// Thin wrapper around neo4rs::Graph providing connection setup.
#[derive(Clone)]
pub struct GraphClient {
    pub(crate) graph: Graph,
}

impl GraphClient {
    /// Connect to Neo4j with the given credentials.
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self, neo4rs::Error> {
        let config = ConfigBuilder::default()
            .uri(uri)
            .user(user)
            .password(password)
            .fetch_size(500)
            .max_connections(4)
            .build()?;
        let graph = Graph::connect(config).await?;
        Ok(Self { graph })
    }

    /// Get a reference to the underlying neo4rs Graph.
    pub fn inner(&self) -> &Graph {
        &self.graph
    }
}

#[async_trait]
impl FilmGraphStore for GraphClient {
    async fn ensure_constraint(&self, constraint: &UniqueConstraint) -> Result<(), StoreError> {
        Ok(migrate::create_constraint(self, constraint).await?)
    }

    async fn apply(&self, plan: &WritePlan) -> Result<WriteCounters, StoreError> {
        GraphWriter::new(self.clone()).apply(plan).await
    }

    async fn stats(&self) -> Result<GraphStats, StoreError> {
        GraphReader::new(self.clone()).stats().await
    }

    async fn count_label(&self, label: NodeLabel) -> Result<u64, StoreError> {
        GraphReader::new(self.clone()).count_label(label).await
    }

    async fn count_relationships(&self, rel: RelType) -> Result<u64, StoreError> {
        GraphReader::new(self.clone()).count_relationships(rel).await
    }
}
