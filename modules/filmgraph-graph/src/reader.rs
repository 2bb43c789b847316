use neo4rs::query;

use crate::schema::{NodeLabel, RelType};
use crate::store::{decoded, decoded_count, sort_distribution, GraphStats, StoreError};
use crate::GraphClient;

/// Read-only graph summaries.
pub struct GraphReader {
    client: GraphClient,
}

impl GraphReader {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    pub async fn stats(&self) -> Result<GraphStats, StoreError> {
        let total_nodes = self.scalar_count("MATCH (n) RETURN count(n) AS count").await?;
        let total_relationships = self
            .scalar_count("MATCH ()-[r]->() RETURN count(r) AS count")
            .await?;

        let mut label_distribution = self
            .distribution(
                "MATCH (n) UNWIND labels(n) AS name
                 RETURN name, count(*) AS count",
            )
            .await?;
        sort_distribution(&mut label_distribution);

        let mut relationship_distribution = self
            .distribution(
                "MATCH ()-[r]->()
                 RETURN type(r) AS name, count(*) AS count",
            )
            .await?;
        sort_distribution(&mut relationship_distribution);

        Ok(GraphStats {
            total_nodes,
            total_relationships,
            label_distribution,
            relationship_distribution,
        })
    }

    pub async fn count_label(&self, label: NodeLabel) -> Result<u64, StoreError> {
        self.scalar_count(&format!("MATCH (n:{}) RETURN count(n) AS count", label.as_str()))
            .await
    }

    pub async fn count_relationships(&self, rel: RelType) -> Result<u64, StoreError> {
        self.scalar_count(&format!(
            "MATCH ()-[r:{}]->() RETURN count(r) AS count",
            rel.as_str()
        ))
        .await
    }

    async fn scalar_count(&self, cypher: &str) -> Result<u64, StoreError> {
        let mut stream = self.client.graph.execute(query(cypher)).await?;
        if let Some(row) = stream.next().await? {
            return decoded_count("count", row.get::<i64>("count"));
        }
        Ok(0)
    }

    async fn distribution(&self, cypher: &str) -> Result<Vec<(String, u64)>, StoreError> {
        let mut stream = self.client.graph.execute(query(cypher)).await?;
        let mut out = Vec::new();
        while let Some(row) = stream.next().await? {
            let name = decoded("name", row.get::<String>("name"))?;
            let count = decoded_count("count", row.get::<i64>("count"))?;
            out.push((name, count));
        }
        Ok(out)
    }
}
