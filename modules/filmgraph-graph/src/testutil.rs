//! Throwaway Neo4j for integration tests (Docker required).

use testcontainers::{
    core::{ContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};

use crate::migrate::ensure_identity_constraints;
use crate::GraphClient;

const NEO4J_IMAGE: &str = "neo4j";
const NEO4J_TAG: &str = "5.25.1-community";
const BOLT_PORT: u16 = 7687;
const PASSWORD: &str = "filmgraph-test";

/// Start a community Neo4j and connect a `GraphClient` to it.
///
/// Keep the returned container alive for the whole test; dropping it stops
/// the database.
pub async fn neo4j_container() -> (ContainerAsync<GenericImage>, GraphClient) {
    let container = GenericImage::new(NEO4J_IMAGE, NEO4J_TAG)
        .with_exposed_port(ContainerPort::Tcp(BOLT_PORT))
        .with_wait_for(WaitFor::message_on_stdout("Started."))
        .with_env_var("NEO4J_AUTH", format!("neo4j/{PASSWORD}"))
        .start()
        .await
        .expect("Neo4j container did not start");

    let port = container
        .get_host_port_ipv4(BOLT_PORT)
        .await
        .expect("Neo4j bolt port not mapped");

    let client = GraphClient::connect(&format!("bolt://127.0.0.1:{port}"), "neo4j", PASSWORD)
        .await
        .expect("could not connect to Neo4j container");

    (container, client)
}

/// Like [`neo4j_container`], with the identity constraints already in place.
pub async fn film_graph() -> (ContainerAsync<GenericImage>, GraphClient) {
    let (container, client) = neo4j_container().await;
    let report = ensure_identity_constraints(&client).await;
    assert!(report.failed.is_empty(), "constraint setup failed: {:?}", report.failed);
    (container, client)
}
