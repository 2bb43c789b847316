pub mod client;
pub mod linker;
pub mod memory;
pub mod migrate;
pub mod plan;
pub mod reader;
pub mod schema;
pub mod store;
pub mod upsert;
pub mod writer;

#[cfg(feature = "test-utils")]
pub mod testutil;

pub use client::GraphClient;
pub use linker::link_project_members;
pub use memory::MemoryGraph;
pub use migrate::{ensure_identity_constraints, ConstraintReport};
pub use neo4rs::query;
pub use plan::{NodeRef, PropValue, WritePlan};
pub use schema::{KeyProp, NodeLabel, RelType, SchemaError, UniqueConstraint, IDENTITY_CONSTRAINTS};
pub use store::{FilmGraphStore, GraphStats, StoreError, WriteCounters};
pub use upsert::{plan_batch, upsert_batch};
