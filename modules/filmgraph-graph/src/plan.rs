//! Store-agnostic description of one transaction's worth of merges.
//!
//! A `WritePlan` is built in memory, deduplicated, and then handed to a
//! `FilmGraphStore` which applies it atomically. Nodes are always applied
//! before edges so edge endpoints can be matched.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::schema::{KeyProp, NodeLabel, RelType};

/// A scalar property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Str(String),
    Int(i64),
    Float(f64),
    /// Removes the property on write.
    Null,
}

impl From<Option<i64>> for PropValue {
    fn from(v: Option<i64>) -> Self {
        v.map(PropValue::Int).unwrap_or(PropValue::Null)
    }
}

impl From<Option<f64>> for PropValue {
    fn from(v: Option<f64>) -> Self {
        v.map(PropValue::Float).unwrap_or(PropValue::Null)
    }
}

impl From<Option<String>> for PropValue {
    fn from(v: Option<String>) -> Self {
        v.map(PropValue::Str).unwrap_or(PropValue::Null)
    }
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        PropValue::Str(v.to_string())
    }
}

pub type Props = BTreeMap<&'static str, PropValue>;

/// Locates existing nodes by a key property. Matching on a label's identity
/// key hits at most one node; matching on another property (e.g. a film
/// title) may hit several.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub label: NodeLabel,
    pub key: KeyProp,
    pub value: String,
}

impl NodeRef {
    /// Reference by the label's identity key.
    pub fn id(label: NodeLabel, value: impl Into<String>) -> Self {
        Self {
            label,
            key: label.identity_key(),
            value: value.into(),
        }
    }

    pub fn by(label: NodeLabel, key: KeyProp, value: impl Into<String>) -> Self {
        Self {
            label,
            key,
            value: value.into(),
        }
    }
}

/// Merge a node by identity key, then overwrite the given properties.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMerge {
    pub label: NodeLabel,
    pub key: String,
    pub props: Props,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeMerge {
    pub rel: RelType,
    pub from: NodeRef,
    pub to: NodeRef,
}

#[derive(Debug, Default, Clone)]
pub struct WritePlan {
    nodes: Vec<NodeMerge>,
    edges: Vec<EdgeMerge>,
    node_index: HashMap<(NodeLabel, String), usize>,
    edge_index: HashSet<EdgeMerge>,
}

impl WritePlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a node merge. A repeated (label, key) folds into the earlier
    /// entry with later properties winning.
    pub fn merge_node(&mut self, label: NodeLabel, key: impl Into<String>, props: Props) {
        let key = key.into();
        match self.node_index.get(&(label, key.clone())) {
            Some(&i) => self.nodes[i].props.extend(props),
            None => {
                self.node_index.insert((label, key.clone()), self.nodes.len());
                self.nodes.push(NodeMerge { label, key, props });
            }
        }
    }

    /// Queue an edge merge. Duplicates are dropped.
    pub fn merge_edge(&mut self, rel: RelType, from: NodeRef, to: NodeRef) {
        debug_assert_eq!((from.label, to.label), rel.endpoints());
        let edge = EdgeMerge { rel, from, to };
        if self.edge_index.insert(edge.clone()) {
            self.edges.push(edge);
        }
    }

    pub fn nodes(&self) -> &[NodeMerge] {
        &self.nodes
    }

    pub fn edges(&self) -> &[EdgeMerge] {
        &self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Nodes grouped by label, in first-seen order.
    pub fn nodes_by_label(&self) -> Vec<(NodeLabel, Vec<&NodeMerge>)> {
        let mut groups: Vec<(NodeLabel, Vec<&NodeMerge>)> = Vec::new();
        for node in &self.nodes {
            match groups.iter_mut().find(|(l, _)| *l == node.label) {
                Some((_, members)) => members.push(node),
                None => groups.push((node.label, vec![node])),
            }
        }
        groups
    }

    /// Edges grouped by (relationship, start key, end key), in first-seen
    /// order. Each group maps onto one parametrized statement.
    pub fn edges_by_shape(&self) -> Vec<(EdgeShape, Vec<&EdgeMerge>)> {
        let mut groups: Vec<(EdgeShape, Vec<&EdgeMerge>)> = Vec::new();
        for edge in &self.edges {
            let shape = EdgeShape {
                rel: edge.rel,
                from_key: edge.from.key,
                to_key: edge.to.key,
            };
            match groups.iter_mut().find(|(s, _)| *s == shape) {
                Some((_, members)) => members.push(edge),
                None => groups.push((shape, vec![edge])),
            }
        }
        groups
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeShape {
    pub rel: RelType,
    pub from_key: KeyProp,
    pub to_key: KeyProp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_node_merges_fold_with_last_write_winning() {
        let mut plan = WritePlan::new();
        plan.merge_node(
            NodeLabel::Film,
            "1",
            Props::from([("title", "Old".into()), ("year", PropValue::Int(1999))]),
        );
        plan.merge_node(NodeLabel::Film, "1", Props::from([("title", "New".into())]));

        assert_eq!(plan.nodes().len(), 1);
        let props = &plan.nodes()[0].props;
        assert_eq!(props["title"], PropValue::Str("New".into()));
        assert_eq!(props["year"], PropValue::Int(1999));
    }

    #[test]
    fn duplicate_edges_are_dropped() {
        let mut plan = WritePlan::new();
        for _ in 0..3 {
            plan.merge_edge(
                RelType::ActedIn,
                NodeRef::id(NodeLabel::Actor, "C"),
                NodeRef::id(NodeLabel::Film, "1"),
            );
        }
        assert_eq!(plan.edges().len(), 1);
    }

    #[test]
    fn title_matched_edges_form_their_own_group() {
        let mut plan = WritePlan::new();
        plan.merge_edge(
            RelType::PartOfProjectTeam,
            NodeRef::id(NodeLabel::Actor, "M1"),
            NodeRef::by(NodeLabel::Film, KeyProp::Title, "X"),
        );
        plan.merge_edge(
            RelType::ActedIn,
            NodeRef::id(NodeLabel::Actor, "M1"),
            NodeRef::id(NodeLabel::Film, "1"),
        );

        let groups = plan.edges_by_shape();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0.to_key, KeyProp::Title);
        assert_eq!(groups[1].0.to_key, KeyProp::SourceId);
    }
}
