//! Live check against the Neo4j named in the environment (or `.env`).
//! Run with: cargo test -p filmgraph-graph --test cloud_connect -- --ignored

use filmgraph_common::AppConfig;
use filmgraph_graph::{ensure_identity_constraints, FilmGraphStore, GraphClient};

#[tokio::test]
#[ignore] // requires NEO4J_URI / NEO4J_USER / NEO4J_PASSWORD
async fn live_store_accepts_constraints_and_reports_stats() {
    let creds = AppConfig::from_env().neo4j().expect("Neo4j credentials");
    let client = GraphClient::connect(&creds.uri, &creds.user, &creds.password)
        .await
        .expect("connect");

    let report = ensure_identity_constraints(&client).await;
    assert!(report.failed.is_empty(), "{:?}", report.failed);

    let stats = client.stats().await.expect("stats");
    let labelled: u64 = stats.label_distribution.iter().map(|(_, n)| n).sum();
    assert!(labelled >= stats.total_nodes || stats.total_nodes == 0);
}
