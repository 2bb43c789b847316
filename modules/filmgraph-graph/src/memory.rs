//! In-memory `FilmGraphStore`.
//!
//! Applies plans against a copy of the current state and swaps it in only
//! when every merge succeeded, which gives the same all-or-nothing behaviour
//! as a Neo4j transaction. Backs `--dry-run` and the pipeline tests.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::plan::{NodeRef, PropValue, Props, WritePlan};
use crate::schema::{NodeLabel, RelType, UniqueConstraint};
use crate::store::{sort_distribution, FilmGraphStore, GraphStats, StoreError, WriteCounters};

type NodeId = (NodeLabel, String);

#[derive(Debug, Default, Clone)]
struct GraphState {
    nodes: BTreeMap<NodeId, Props>,
    edges: BTreeSet<(RelType, NodeId, NodeId)>,
    constraints: BTreeSet<&'static str>,
}

impl GraphState {
    /// Resolve a reference to zero or more existing nodes.
    fn resolve(&self, r: &NodeRef) -> Vec<NodeId> {
        if r.key == r.label.identity_key() {
            let id = (r.label, r.value.clone());
            return if self.nodes.contains_key(&id) { vec![id] } else { Vec::new() };
        }
        self.nodes
            .iter()
            .filter(|((label, _), props)| {
                *label == r.label
                    && matches!(props.get(r.key.as_str()), Some(PropValue::Str(v)) if *v == r.value)
            })
            .map(|(id, _)| id.clone())
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct MemoryGraph {
    state: Mutex<GraphState>,
    poisoned: Mutex<HashSet<NodeId>>,
    reject_constraints: bool,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// A graph that refuses every constraint creation, as a store without
    /// schema privileges would.
    pub fn rejecting_constraints() -> Self {
        Self {
            reject_constraints: true,
            ..Self::default()
        }
    }

    /// Make any plan that merges this node fail.
    pub fn poison(&self, label: NodeLabel, key: impl Into<String>) {
        self.lock_poisoned().insert((label, key.into()));
    }

    pub fn node(&self, label: NodeLabel, key: &str) -> Option<Props> {
        self.lock_state().nodes.get(&(label, key.to_string())).cloned()
    }

    pub fn has_edge(&self, rel: RelType, from: &str, to: &str) -> bool {
        let (from_label, to_label) = rel.endpoints();
        self.lock_state().edges.contains(&(
            rel,
            (from_label, from.to_string()),
            (to_label, to.to_string()),
        ))
    }

    pub fn node_count(&self) -> usize {
        self.lock_state().nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.lock_state().edges.len()
    }

    pub fn constraints(&self) -> Vec<&'static str> {
        self.lock_state().constraints.iter().copied().collect()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, GraphState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_poisoned(&self) -> std::sync::MutexGuard<'_, HashSet<NodeId>> {
        self.poisoned.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl FilmGraphStore for MemoryGraph {
    async fn ensure_constraint(&self, constraint: &UniqueConstraint) -> Result<(), StoreError> {
        if self.reject_constraints {
            return Err(StoreError::Rejected(format!(
                "not allowed to create constraint {}",
                constraint.name
            )));
        }
        self.lock_state().constraints.insert(constraint.name);
        Ok(())
    }

    async fn apply(&self, plan: &WritePlan) -> Result<WriteCounters, StoreError> {
        let poisoned = self.lock_poisoned().clone();
        let mut state = self.lock_state();
        let mut next = state.clone();
        let mut counters = WriteCounters::default();

        for node in plan.nodes() {
            let id = (node.label, node.key.clone());
            if poisoned.contains(&id) {
                return Err(StoreError::Rejected(format!(
                    "merge of {} {:?} refused",
                    node.label, node.key
                )));
            }
            let props = next.nodes.entry(id).or_insert_with(|| {
                counters.nodes_created += 1;
                Props::new()
            });
            for (k, v) in &node.props {
                if *v == PropValue::Null {
                    props.remove(k);
                } else {
                    props.insert(*k, v.clone());
                }
            }
        }

        for edge in plan.edges() {
            let starts = next.resolve(&edge.from);
            let ends = next.resolve(&edge.to);
            for start in &starts {
                for end in &ends {
                    if next.edges.insert((edge.rel, start.clone(), end.clone())) {
                        counters.relationships_created += 1;
                    }
                }
            }
        }

        *state = next;
        Ok(counters)
    }

    async fn stats(&self) -> Result<GraphStats, StoreError> {
        let state = self.lock_state();

        let mut labels: BTreeMap<String, u64> = BTreeMap::new();
        for (label, _) in state.nodes.keys() {
            *labels.entry(label.to_string()).or_default() += 1;
        }
        let mut rels: BTreeMap<String, u64> = BTreeMap::new();
        for (rel, _, _) in &state.edges {
            *rels.entry(rel.to_string()).or_default() += 1;
        }

        let mut label_distribution: Vec<_> = labels.into_iter().collect();
        sort_distribution(&mut label_distribution);
        let mut relationship_distribution: Vec<_> = rels.into_iter().collect();
        sort_distribution(&mut relationship_distribution);

        Ok(GraphStats {
            total_nodes: state.nodes.len() as u64,
            total_relationships: state.edges.len() as u64,
            label_distribution,
            relationship_distribution,
        })
    }

    async fn count_label(&self, label: NodeLabel) -> Result<u64, StoreError> {
        Ok(self.lock_state().nodes.keys().filter(|(l, _)| *l == label).count() as u64)
    }

    async fn count_relationships(&self, rel: RelType) -> Result<u64, StoreError> {
        Ok(self.lock_state().edges.iter().filter(|(r, _, _)| *r == rel).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linker::link_project_members;
    use crate::upsert::{plan_batch, upsert_batch};
    use filmgraph_common::CanonicalFilmRecord;

    fn film(id: &str, title: &str, actors: &[&str], directors: &[&str]) -> CanonicalFilmRecord {
        CanonicalFilmRecord {
            actors: actors.iter().map(|s| s.to_string()).collect(),
            directors: directors.iter().map(|s| s.to_string()).collect(),
            primary_director: directors.first().map(|s| s.to_string()),
            genres: vec!["Drama".into()],
            ..CanonicalFilmRecord::new(id, title)
        }
    }

    #[tokio::test]
    async fn applying_the_same_batch_twice_creates_nothing_new() {
        let graph = MemoryGraph::new();
        let batch = vec![film("1", "X", &["C"], &["A", "B"]), film("2", "Y", &["C"], &["A"])];

        let first = upsert_batch(&graph, &batch).await.unwrap();
        let (nodes, edges) = (graph.node_count(), graph.edge_count());
        let second = upsert_batch(&graph, &batch).await.unwrap();

        assert_eq!(first.nodes_created, nodes as u64);
        assert_eq!(first.relationships_created, edges as u64);
        assert_eq!(second, WriteCounters::default());
        assert_eq!((graph.node_count(), graph.edge_count()), (nodes, edges));
    }

    #[tokio::test]
    async fn failed_plan_leaves_no_trace() {
        let graph = MemoryGraph::new();
        graph.poison(NodeLabel::Film, "3");
        let batch = vec![film("1", "X", &["C"], &["A"]), film("3", "Z", &["D"], &[])];

        let err = upsert_batch(&graph, &batch).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
    }

    #[tokio::test]
    async fn null_properties_are_removed_on_overwrite() {
        let graph = MemoryGraph::new();
        let mut first = CanonicalFilmRecord::new("1", "X");
        first.year = Some(1999);
        graph.apply(&plan_batch(&[first])).await.unwrap();
        graph
            .apply(&plan_batch(&[CanonicalFilmRecord::new("1", "X2")]))
            .await
            .unwrap();

        let props = graph.node(NodeLabel::Film, "1").unwrap();
        assert_eq!(props.get("title"), Some(&PropValue::Str("X2".into())));
        assert!(props.get("year").is_none());
    }

    #[tokio::test]
    async fn linker_reuses_actor_identity_and_matches_titles() {
        let graph = MemoryGraph::new();
        upsert_batch(&graph, &[film("1", "X", &["C"], &["A"])]).await.unwrap();

        let counters = link_project_members(&graph, &["C", "M1"], "X").await.unwrap();
        assert_eq!(counters.nodes_created, 1);
        assert_eq!(counters.relationships_created, 2);
        assert!(graph.has_edge(RelType::PartOfProjectTeam, "M1", "1"));
        assert!(graph.has_edge(RelType::PartOfProjectTeam, "C", "1"));
    }

    #[tokio::test]
    async fn stats_are_sorted_largest_first() {
        let graph = MemoryGraph::new();
        upsert_batch(&graph, &[film("1", "X", &["C", "D"], &["A"])]).await.unwrap();

        let stats = graph.stats().await.unwrap();
        assert_eq!(stats.total_nodes, 5);
        assert_eq!(stats.label_distribution[0], ("Actor".to_string(), 2));
        assert_eq!(graph.count_label(NodeLabel::Director).await.unwrap(), 1);
        assert_eq!(graph.count_relationships(RelType::WorkedWith).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn rejected_constraints_are_reported() {
        let graph = MemoryGraph::rejecting_constraints();
        let report = crate::migrate::ensure_identity_constraints(&graph).await;
        assert!(report.ensured.is_empty());
        assert_eq!(report.failed.len(), 4);

        let graph = MemoryGraph::new();
        let report = crate::migrate::ensure_identity_constraints(&graph).await;
        assert_eq!(report.ensured.len(), 4);
        assert_eq!(graph.constraints().len(), 4);
    }
}
