use neo4rs::query;
use tracing::{info, warn};

use crate::schema::{UniqueConstraint, IDENTITY_CONSTRAINTS};
use crate::store::FilmGraphStore;
use crate::GraphClient;

/// Outcome of constraint setup. Failures are informational: constraints
/// usually survive from an earlier run.
#[derive(Debug, Default, Clone)]
pub struct ConstraintReport {
    pub ensured: Vec<&'static str>,
    pub failed: Vec<(&'static str, String)>,
}

/// Create one uniqueness constraint, create-if-not-exists.
pub async fn create_constraint(
    client: &GraphClient,
    constraint: &UniqueConstraint,
) -> Result<(), neo4rs::Error> {
    client.graph.run(query(&constraint.cypher())).await
}

/// Establish the identity constraints on `Film`, `Actor`, `Director` and
/// `Genre`. Never fails; each failure is logged as a warning and recorded.
pub async fn ensure_identity_constraints(store: &dyn FilmGraphStore) -> ConstraintReport {
    let mut report = ConstraintReport::default();

    for constraint in &IDENTITY_CONSTRAINTS {
        match store.ensure_constraint(constraint).await {
            Ok(()) => report.ensured.push(constraint.name),
            Err(e) => {
                warn!(
                    constraint = constraint.name,
                    error = %e,
                    "Constraint setup failed (non-fatal)"
                );
                report.failed.push((constraint.name, e.to_string()));
            }
        }
    }

    info!(
        ensured = report.ensured.len(),
        failed = report.failed.len(),
        "Identity constraints checked"
    );
    report
}
