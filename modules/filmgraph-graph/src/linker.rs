//! Project-membership linker: attaches auxiliary members to one film.

use crate::plan::{NodeRef, Props, WritePlan};
use crate::schema::{KeyProp, NodeLabel, RelType};
use crate::store::{FilmGraphStore, StoreError, WriteCounters};

/// Build the plan linking `members` to every film titled exactly
/// `film_title`.
///
/// Members share the `Actor` identity space: a member with the same name as
/// an imported actor is the same node.
pub fn plan_project_team<S: AsRef<str>>(members: &[S], film_title: &str) -> WritePlan {
    let mut plan = WritePlan::new();
    let film = NodeRef::by(NodeLabel::Film, KeyProp::Title, film_title);

    for member in members.iter().map(|m| m.as_ref().trim()).filter(|m| !m.is_empty()) {
        plan.merge_node(NodeLabel::Actor, member, Props::new());
        plan.merge_edge(
            RelType::PartOfProjectTeam,
            NodeRef::id(NodeLabel::Actor, member),
            film.clone(),
        );
    }

    plan
}

/// Link members to a film in a single transaction. An unknown title is not
/// an error: the actors are merged and zero relationships are created.
pub async fn link_project_members<S: AsRef<str>>(
    store: &dyn FilmGraphStore,
    members: &[S],
    film_title: &str,
) -> Result<WriteCounters, StoreError> {
    store.apply(&plan_project_team(members, film_title)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn members_are_trimmed_and_blank_ones_dropped() {
        let plan = plan_project_team(&[" M1 ", "", "M2", "M1"], "X");
        let names: Vec<_> = plan.nodes().iter().map(|n| n.key.as_str()).collect();
        assert_eq!(names, vec!["M1", "M2"]);
        assert_eq!(plan.edges().len(), 2);
    }

    #[test]
    fn film_is_matched_by_exact_title() {
        let plan = plan_project_team(&["M1"], "The Film");
        let edge = &plan.edges()[0];
        assert_eq!(edge.to.key, KeyProp::Title);
        assert_eq!(edge.to.value, "The Film");
        assert_eq!(edge.from.label, NodeLabel::Actor);
    }
}
