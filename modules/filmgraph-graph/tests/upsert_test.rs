#![cfg(feature = "test-utils")]

// Upsert engine and linker against a real Neo4j.
//
// Requirements: Docker (for Neo4j via testcontainers)
//
// Run with: cargo test -p filmgraph-graph --features test-utils --test upsert_test

use filmgraph_common::CanonicalFilmRecord;
use filmgraph_graph::{
    ensure_identity_constraints, link_project_members, query, upsert_batch, FilmGraphStore,
    GraphClient, NodeLabel, RelType,
};

use filmgraph_graph::testutil::{film_graph, neo4j_container};

fn film(id: &str, title: &str) -> CanonicalFilmRecord {
    CanonicalFilmRecord {
        year: Some(1999),
        vote_count: Some(1200),
        directors: vec!["A".into(), "B".into()],
        primary_director: Some("A".into()),
        actors: vec!["C".into()],
        genres: vec!["Drama".into()],
        revenue: Some(1_500_000.0),
        ..CanonicalFilmRecord::new(id, title)
    }
}

async fn read_film_prop<T: for<'a> serde::Deserialize<'a> + Default>(
    client: &GraphClient,
    source_id: &str,
    prop: &str,
) -> T {
    let cypher = format!("MATCH (f:Film {{sourceId: $id}}) RETURN f.{prop} AS val");
    let q = query(&cypher).param("id", source_id);
    let mut stream = client.inner().execute(q).await.expect("query failed");
    if let Some(row) = stream.next().await.expect("stream failed") {
        row.get::<T>("val").unwrap_or_default()
    } else {
        T::default()
    }
}

#[tokio::test]
async fn constraints_can_be_ensured_repeatedly() {
    let (_c, client) = neo4j_container().await;

    let first = ensure_identity_constraints(&client).await;
    let second = ensure_identity_constraints(&client).await;

    assert!(first.failed.is_empty(), "{:?}", first.failed);
    assert!(second.failed.is_empty(), "{:?}", second.failed);
}

#[tokio::test]
async fn upserting_a_batch_twice_creates_no_duplicates() {
    let (_c, client) = film_graph().await;
    let batch = vec![film("1", "X"), film("2", "Y")];

    let first = upsert_batch(&client, &batch).await.expect("first upsert");
    let after_first = client.stats().await.unwrap();
    let second = upsert_batch(&client, &batch).await.expect("second upsert");
    let after_second = client.stats().await.unwrap();

    // Film×2, Genre, Actor, Director×2
    assert_eq!(first.nodes_created, 6);
    assert_eq!(second.nodes_created, 0);
    assert_eq!(second.relationships_created, 0);
    assert_eq!(after_first, after_second);
    assert_eq!(client.count_relationships(RelType::WorkedWith).await.unwrap(), 2);
    assert_eq!(client.count_relationships(RelType::Directed).await.unwrap(), 4);

    let revenue: f64 = read_film_prop(&client, "1", "revenue").await;
    assert_eq!(revenue, 1_500_000.0);
    let primary: String = read_film_prop(&client, "2", "primaryDirector").await;
    assert_eq!(primary, "A");
}

#[tokio::test]
async fn failing_record_rolls_back_the_whole_batch() {
    let (_c, client) = film_graph().await;

    // Force a constraint violation on the second film's title.
    client
        .inner()
        .run(query(
            "CREATE CONSTRAINT film_title IF NOT EXISTS FOR (f:Film) REQUIRE f.title IS UNIQUE",
        ))
        .await
        .unwrap();
    client
        .inner()
        .run(query("CREATE (:Film {sourceId: 'existing', title: 'Dup'})"))
        .await
        .unwrap();

    let batch = vec![film("a", "Fresh"), film("b", "Dup")];
    let result = upsert_batch(&client, &batch).await;
    assert!(result.is_err());

    assert_eq!(client.count_label(NodeLabel::Film).await.unwrap(), 1);
    assert_eq!(client.count_label(NodeLabel::Actor).await.unwrap(), 0);
    assert_eq!(client.count_label(NodeLabel::Genre).await.unwrap(), 0);
    assert_eq!(client.stats().await.unwrap().total_relationships, 0);
}

#[tokio::test]
async fn linker_with_unknown_title_creates_no_edges() {
    let (_c, client) = film_graph().await;
    upsert_batch(&client, &[film("1", "X")]).await.unwrap();

    let counters = link_project_members(&client, &["M1"], "Unknown Title")
        .await
        .expect("linker should not fail");

    assert_eq!(counters.relationships_created, 0);
    assert_eq!(counters.nodes_created, 1);
    assert_eq!(
        client.count_relationships(RelType::PartOfProjectTeam).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn linker_attaches_members_to_matching_film() {
    let (_c, client) = film_graph().await;
    upsert_batch(&client, &[film("1", "X")]).await.unwrap();

    let first = link_project_members(&client, &["M1", "C"], "X").await.unwrap();
    let again = link_project_members(&client, &["M1", "C"], "X").await.unwrap();

    // "C" already exists as an actor from the import.
    assert_eq!(first.nodes_created, 1);
    assert_eq!(first.relationships_created, 2);
    assert_eq!(again.relationships_created, 0);
}
