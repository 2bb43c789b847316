//! Closed vocabulary of the film graph.
//!
//! Every label, relationship type and key property that reaches Cypher text
//! comes from these enums. Free-form names from callers go through `FromStr`
//! and are rejected when unknown, so nothing user-supplied is ever spliced
//! into a query.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum NodeLabel {
    Film,
    Actor,
    Director,
    Genre,
}

impl NodeLabel {
    pub const ALL: [NodeLabel; 4] = [
        NodeLabel::Film,
        NodeLabel::Actor,
        NodeLabel::Director,
        NodeLabel::Genre,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::Film => "Film",
            NodeLabel::Actor => "Actor",
            NodeLabel::Director => "Director",
            NodeLabel::Genre => "Genre",
        }
    }

    /// The property that identifies a node of this label.
    pub fn identity_key(&self) -> KeyProp {
        match self {
            NodeLabel::Film => KeyProp::SourceId,
            NodeLabel::Actor | NodeLabel::Director | NodeLabel::Genre => KeyProp::Name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RelType {
    ActedIn,
    Directed,
    HasGenre,
    WorkedWith,
    PartOfProjectTeam,
}

impl RelType {
    pub const ALL: [RelType; 5] = [
        RelType::ActedIn,
        RelType::Directed,
        RelType::HasGenre,
        RelType::WorkedWith,
        RelType::PartOfProjectTeam,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelType::ActedIn => "ACTED_IN",
            RelType::Directed => "DIRECTED",
            RelType::HasGenre => "HAS_GENRE",
            RelType::WorkedWith => "WORKED_WITH",
            RelType::PartOfProjectTeam => "PART_OF_PROJECT_TEAM",
        }
    }

    /// (start label, end label) of this relationship.
    pub fn endpoints(&self) -> (NodeLabel, NodeLabel) {
        match self {
            RelType::ActedIn => (NodeLabel::Actor, NodeLabel::Film),
            RelType::Directed => (NodeLabel::Director, NodeLabel::Film),
            RelType::HasGenre => (NodeLabel::Film, NodeLabel::Genre),
            RelType::WorkedWith => (NodeLabel::Director, NodeLabel::Actor),
            RelType::PartOfProjectTeam => (NodeLabel::Actor, NodeLabel::Film),
        }
    }
}

/// Property names usable to locate a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum KeyProp {
    SourceId,
    Name,
    Title,
}

impl KeyProp {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyProp::SourceId => "sourceId",
            KeyProp::Name => "name",
            KeyProp::Title => "title",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("unknown node label: {0:?}")]
    UnknownLabel(String),

    #[error("unknown relationship type: {0:?}")]
    UnknownRelType(String),
}

impl FromStr for NodeLabel {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeLabel::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SchemaError::UnknownLabel(s.to_string()))
    }
}

impl FromStr for RelType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RelType::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SchemaError::UnknownRelType(s.to_string()))
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for RelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A uniqueness constraint on a label's identity key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniqueConstraint {
    pub name: &'static str,
    pub label: NodeLabel,
}

impl UniqueConstraint {
    pub fn key(&self) -> KeyProp {
        self.label.identity_key()
    }

    /// Neo4j 5 DDL, create-if-not-exists.
    pub fn cypher(&self) -> String {
        format!(
            "CREATE CONSTRAINT {name} IF NOT EXISTS FOR (n:{label}) REQUIRE n.{key} IS UNIQUE",
            name = self.name,
            label = self.label.as_str(),
            key = self.key().as_str(),
        )
    }
}

/// The four constraints established before an import.
pub const IDENTITY_CONSTRAINTS: [UniqueConstraint; 4] = [
    UniqueConstraint { name: "film_source_id", label: NodeLabel::Film },
    UniqueConstraint { name: "actor_name", label: NodeLabel::Actor },
    UniqueConstraint { name: "director_name", label: NodeLabel::Director },
    UniqueConstraint { name: "genre_name", label: NodeLabel::Genre },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!("film".parse::<NodeLabel>().unwrap(), NodeLabel::Film);
        assert_eq!(" Director ".parse::<NodeLabel>().unwrap(), NodeLabel::Director);
    }

    #[test]
    fn injection_attempts_are_rejected() {
        let err = "Film) DETACH DELETE (n".parse::<NodeLabel>().unwrap_err();
        assert!(matches!(err, SchemaError::UnknownLabel(_)));
        assert!("ACTED_IN]->() DELETE r//".parse::<RelType>().is_err());
    }

    #[test]
    fn rel_types_round_trip_through_display() {
        for rel in RelType::ALL {
            assert_eq!(rel.to_string().parse::<RelType>().unwrap(), rel);
        }
    }

    #[test]
    fn constraint_ddl_uses_identity_key() {
        let film = IDENTITY_CONSTRAINTS[0];
        assert_eq!(
            film.cypher(),
            "CREATE CONSTRAINT film_source_id IF NOT EXISTS FOR (n:Film) REQUIRE n.sourceId IS UNIQUE"
        );
        assert_eq!(IDENTITY_CONSTRAINTS[3].key(), KeyProp::Name);
    }
}
