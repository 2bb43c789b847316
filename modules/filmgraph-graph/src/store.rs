use std::fmt;
use std::ops::AddAssign;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::plan::WritePlan;
use crate::schema::{NodeLabel, RelType, UniqueConstraint};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Neo4j error: {0}")]
    Neo4j(#[from] neo4rs::Error),

    #[error("Write rejected: {0}")]
    Rejected(String),

    #[error("Could not decode column `{column}`: {message}")]
    Decode {
        column: &'static str,
        message: String,
    },
}

/// Mutation counters returned by an applied plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteCounters {
    pub nodes_created: u64,
    pub relationships_created: u64,
}

impl AddAssign for WriteCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.nodes_created += rhs.nodes_created;
        self.relationships_created += rhs.relationships_created;
    }
}

impl fmt::Display for WriteCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} nodes created, {} relationships created",
            self.nodes_created, self.relationships_created
        )
    }
}

/// Whole-graph shape summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphStats {
    pub total_nodes: u64,
    pub total_relationships: u64,
    /// Label → node count, largest first.
    pub label_distribution: Vec<(String, u64)>,
    /// Relationship type → count, largest first.
    pub relationship_distribution: Vec<(String, u64)>,
}

impl fmt::Display for GraphStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Nodes: {}", self.total_nodes)?;
        writeln!(f, "Relationships: {}", self.total_relationships)?;
        for (label, count) in &self.label_distribution {
            writeln!(f, "  :{label} {count}")?;
        }
        for (rel, count) in &self.relationship_distribution {
            writeln!(f, "  [:{rel}] {count}")?;
        }
        Ok(())
    }
}

/// Transactional write access to the film graph.
///
/// `apply` is all-or-nothing: either every merge in the plan is visible
/// afterwards or none is.
#[async_trait]
pub trait FilmGraphStore: Send + Sync {
    /// Create a uniqueness constraint unless it already exists.
    async fn ensure_constraint(&self, constraint: &UniqueConstraint) -> Result<(), StoreError>;

    /// Apply one plan inside one transaction.
    async fn apply(&self, plan: &WritePlan) -> Result<WriteCounters, StoreError>;

    async fn stats(&self) -> Result<GraphStats, StoreError>;

    async fn count_label(&self, label: NodeLabel) -> Result<u64, StoreError>;

    async fn count_relationships(&self, rel: RelType) -> Result<u64, StoreError>;
}

/// Take a decoded row value, turning a decode failure into a `StoreError`.
pub(crate) fn decoded<T, E: fmt::Display>(
    column: &'static str,
    value: Result<T, E>,
) -> Result<T, StoreError> {
    value.map_err(|e| StoreError::Decode {
        column,
        message: e.to_string(),
    })
}

/// A count column. Negative values are a decode failure, not zero.
pub(crate) fn decoded_count<E: fmt::Display>(
    column: &'static str,
    value: Result<i64, E>,
) -> Result<u64, StoreError> {
    let n = decoded(column, value)?;
    u64::try_from(n).map_err(|_| StoreError::Decode {
        column,
        message: format!("negative count {n}"),
    })
}

/// Sort a distribution largest-first, ties by name.
pub(crate) fn sort_distribution(dist: &mut [(String, u64)]) {
    dist.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undecodable_count_is_an_error_not_zero() {
        let err = decoded_count("created", Err::<i64, _>("expected Integer, got String"))
            .unwrap_err();
        match err {
            StoreError::Decode { column, message } => {
                assert_eq!(column, "created");
                assert!(message.contains("expected Integer"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn negative_count_is_rejected() {
        assert!(matches!(
            decoded_count("count", Ok::<_, String>(-1)),
            Err(StoreError::Decode { column: "count", .. })
        ));
        assert_eq!(decoded_count("count", Ok::<_, String>(7)).unwrap(), 7);
    }

    #[test]
    fn distribution_sorts_largest_first_then_by_name() {
        let mut dist = vec![
            ("Genre".to_string(), 2),
            ("Actor".to_string(), 5),
            ("Director".to_string(), 2),
        ];
        sort_distribution(&mut dist);
        let names: Vec<_> = dist.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Actor", "Director", "Genre"]);
    }
}
