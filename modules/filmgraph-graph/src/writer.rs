use neo4rs::{query, BoltFloat, BoltInteger, BoltMap, BoltNull, BoltString, BoltType, Query, Txn};
use tracing::{debug, warn};

use crate::plan::{EdgeMerge, EdgeShape, NodeMerge, PropValue, Props, WritePlan};
use crate::schema::NodeLabel;
use crate::store::{decoded_count, StoreError, WriteCounters};
use crate::GraphClient;

/// Write-side wrapper for the graph. Applies a `WritePlan` in one explicit
/// transaction: nodes by label, then edges by shape, each group as one
/// `UNWIND ... MERGE` statement.
pub struct GraphWriter {
    client: GraphClient,
}

impl GraphWriter {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// Apply the plan atomically. On any statement failure the transaction is
    /// rolled back and the original error returned.
    pub async fn apply(&self, plan: &WritePlan) -> Result<WriteCounters, StoreError> {
        if plan.is_empty() {
            return Ok(WriteCounters::default());
        }

        let mut txn = self.client.graph.start_txn().await?;
        match write_plan(&mut txn, plan).await {
            Ok(counters) => {
                txn.commit().await?;
                debug!(
                    nodes = plan.nodes().len(),
                    edges = plan.edges().len(),
                    nodes_created = counters.nodes_created,
                    relationships_created = counters.relationships_created,
                    "Write plan committed"
                );
                Ok(counters)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    warn!(error = %rollback_err, "Rollback after failed write plan also failed");
                }
                Err(e)
            }
        }
    }
}

async fn write_plan(txn: &mut Txn, plan: &WritePlan) -> Result<WriteCounters, StoreError> {
    let mut counters = WriteCounters::default();

    for (label, nodes) in plan.nodes_by_label() {
        counters.nodes_created += run_counted(txn, node_statement(label, &nodes)).await?;
    }

    for (shape, edges) in plan.edges_by_shape() {
        counters.relationships_created += run_counted(txn, edge_statement(shape, &edges)).await?;
    }

    Ok(counters)
}

/// Run a statement that returns a single `created` column and sum it.
async fn run_counted(txn: &mut Txn, q: Query) -> Result<u64, StoreError> {
    let mut stream = txn.execute(q).await?;
    let mut created = 0u64;
    while let Some(row) = stream.next(&mut *txn).await? {
        created += decoded_count("created", row.get::<i64>("created"))?;
    }
    Ok(created)
}

// The OPTIONAL MATCH before MERGE is what lets us report created counts;
// rows are already unique per key so the count cannot double up.
fn node_statement(label: NodeLabel, nodes: &[&NodeMerge]) -> Query {
    let rows: Vec<BoltType> = nodes
        .iter()
        .map(|n| {
            BoltType::Map(BoltMap::from_iter(vec![
                (BoltString::from("key"), bolt_string(&n.key)),
                (BoltString::from("props"), props_to_bolt(&n.props)),
            ]))
        })
        .collect();

    query(&format!(
        "UNWIND $rows AS row
         OPTIONAL MATCH (existing:{label} {{{key}: row.key}})
         WITH row, existing IS NULL AS fresh
         MERGE (n:{label} {{{key}: row.key}})
         SET n += row.props
         RETURN sum(CASE WHEN fresh THEN 1 ELSE 0 END) AS created",
        label = label.as_str(),
        key = label.identity_key().as_str(),
    ))
    .param("rows", rows)
}

fn edge_statement(shape: EdgeShape, edges: &[&EdgeMerge]) -> Query {
    let (from_label, to_label) = shape.rel.endpoints();
    let rows: Vec<BoltType> = edges
        .iter()
        .map(|e| {
            BoltType::Map(BoltMap::from_iter(vec![
                (BoltString::from("from"), bolt_string(&e.from.value)),
                (BoltString::from("to"), bolt_string(&e.to.value)),
            ]))
        })
        .collect();

    query(&format!(
        "UNWIND $rows AS row
         MATCH (a:{from_label} {{{from_key}: row.from}})
         MATCH (b:{to_label} {{{to_key}: row.to}})
         OPTIONAL MATCH (a)-[existing:{rel}]->(b)
         WITH a, b, count(existing) = 0 AS fresh
         MERGE (a)-[:{rel}]->(b)
         RETURN sum(CASE WHEN fresh THEN 1 ELSE 0 END) AS created",
        from_label = from_label.as_str(),
        from_key = shape.from_key.as_str(),
        to_label = to_label.as_str(),
        to_key = shape.to_key.as_str(),
        rel = shape.rel.as_str(),
    ))
    .param("rows", rows)
}

fn bolt_string(s: &str) -> BoltType {
    BoltType::String(BoltString::from(s))
}

fn props_to_bolt(props: &Props) -> BoltType {
    BoltType::Map(BoltMap::from_iter(
        props
            .iter()
            .map(|(k, v)| (BoltString::from(*k), prop_to_bolt(v))),
    ))
}

fn prop_to_bolt(value: &PropValue) -> BoltType {
    match value {
        PropValue::Str(s) => bolt_string(s),
        PropValue::Int(i) => BoltType::Integer(BoltInteger::new(*i)),
        PropValue::Float(f) => BoltType::Float(BoltFloat::new(*f)),
        PropValue::Null => BoltType::Null(BoltNull),
    }
}
