//! Graph upsert engine: one batch of canonical films, one transaction.

use filmgraph_common::CanonicalFilmRecord;

use crate::plan::{NodeRef, PropValue, Props, WritePlan};
use crate::schema::{NodeLabel, RelType};
use crate::store::{FilmGraphStore, StoreError, WriteCounters};

/// Build the merge plan for one batch.
///
/// Per film: merge the `Film` by source id with all scalar properties, then
/// its genres (`HAS_GENRE`), actors (`ACTED_IN`) and every director
/// (`DIRECTED`, plus `WORKED_WITH` to each actor of the same film).
pub fn plan_batch(batch: &[CanonicalFilmRecord]) -> WritePlan {
    let mut plan = WritePlan::new();

    for film in batch {
        plan.merge_node(NodeLabel::Film, film.source_id.as_str(), film_props(film));
        let film_ref = NodeRef::id(NodeLabel::Film, film.source_id.as_str());

        for genre in non_empty(&film.genres) {
            plan.merge_node(NodeLabel::Genre, genre, Props::new());
            plan.merge_edge(
                RelType::HasGenre,
                film_ref.clone(),
                NodeRef::id(NodeLabel::Genre, genre),
            );
        }

        let actors: Vec<&str> = non_empty(&film.actors).collect();
        for actor in &actors {
            plan.merge_node(NodeLabel::Actor, *actor, Props::new());
            plan.merge_edge(
                RelType::ActedIn,
                NodeRef::id(NodeLabel::Actor, *actor),
                film_ref.clone(),
            );
        }

        for director in non_empty(&film.directors) {
            plan.merge_node(NodeLabel::Director, director, Props::new());
            plan.merge_edge(
                RelType::Directed,
                NodeRef::id(NodeLabel::Director, director),
                film_ref.clone(),
            );
            for actor in &actors {
                plan.merge_edge(
                    RelType::WorkedWith,
                    NodeRef::id(NodeLabel::Director, director),
                    NodeRef::id(NodeLabel::Actor, *actor),
                );
            }
        }
    }

    plan
}

/// Upsert one batch inside exactly one transaction. Any failure leaves none
/// of the batch's mutations behind.
pub async fn upsert_batch(
    store: &dyn FilmGraphStore,
    batch: &[CanonicalFilmRecord],
) -> Result<WriteCounters, StoreError> {
    store.apply(&plan_batch(batch)).await
}

fn film_props(film: &CanonicalFilmRecord) -> Props {
    Props::from([
        ("title", PropValue::from(film.title.as_str())),
        ("year", film.year.into()),
        ("voteCount", film.vote_count.into()),
        ("ratingClass", film.rating_class.clone().into()),
        ("primaryDirector", film.primary_director.clone().into()),
        ("revenue", film.revenue.into()),
    ])
}

fn non_empty(values: &[String]) -> impl Iterator<Item = &str> {
    values.iter().map(|v| v.trim()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::KeyProp;

    fn film() -> CanonicalFilmRecord {
        CanonicalFilmRecord {
            directors: vec!["A".into(), "B".into()],
            primary_director: Some("A".into()),
            actors: vec!["C".into(), "D".into()],
            genres: vec!["Drama".into(), " ".into()],
            year: Some(1999),
            revenue: Some(1_500_000.0),
            ..CanonicalFilmRecord::new("1", "X")
        }
    }

    #[test]
    fn every_director_works_with_every_actor() {
        let plan = plan_batch(&[film()]);
        let worked_with: Vec<_> = plan
            .edges()
            .iter()
            .filter(|e| e.rel == RelType::WorkedWith)
            .map(|e| (e.from.value.as_str(), e.to.value.as_str()))
            .collect();
        assert_eq!(worked_with, vec![("A", "C"), ("A", "D"), ("B", "C"), ("B", "D")]);
    }

    #[test]
    fn blank_names_produce_no_nodes() {
        let plan = plan_batch(&[film()]);
        let genres: Vec<_> = plan
            .nodes()
            .iter()
            .filter(|n| n.label == NodeLabel::Genre)
            .map(|n| n.key.as_str())
            .collect();
        assert_eq!(genres, vec!["Drama"]);
    }

    #[test]
    fn shared_people_are_merged_once_per_batch() {
        let mut other = film();
        other.source_id = "2".into();
        let plan = plan_batch(&[film(), other]);

        let actors = plan.nodes().iter().filter(|n| n.label == NodeLabel::Actor).count();
        let films = plan.nodes().iter().filter(|n| n.label == NodeLabel::Film).count();
        assert_eq!(actors, 2);
        assert_eq!(films, 2);

        let acted_in = plan.edges().iter().filter(|e| e.rel == RelType::ActedIn).count();
        assert_eq!(acted_in, 4);
    }

    #[test]
    fn film_scalars_include_absent_values_as_null() {
        let plan = plan_batch(&[CanonicalFilmRecord::new("9", "Bare")]);
        let props = &plan.nodes()[0].props;
        assert_eq!(props["title"], PropValue::Str("Bare".into()));
        assert_eq!(props["year"], PropValue::Null);
        assert_eq!(props["revenue"], PropValue::Null);
        assert!(plan.edges().is_empty());
    }

    #[test]
    fn edges_reference_films_by_source_id() {
        let plan = plan_batch(&[film()]);
        assert!(plan
            .edges()
            .iter()
            .filter(|e| e.rel != RelType::WorkedWith && e.rel != RelType::HasGenre)
            .all(|e| e.to.key == KeyProp::SourceId && e.to.value == "1"));
    }
}
