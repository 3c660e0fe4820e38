use crate::domain::policy::{ConditionExpr, FieldPredicate};
use crate::domain::resource::ResourceInstance;

/// Returns true if `instance` satisfies `condition`. A missing condition always
/// holds; otherwise every field predicate must hold.
pub fn matches(condition: Option<&ConditionExpr>, instance: &ResourceInstance) -> bool {
    match condition {
        None => true,
        Some(condition) => condition
            .iter()
            .all(|(field, predicate)| predicate_holds(field, predicate, instance)),
    }
}

pub(crate) fn predicate_holds(
    field: &str,
    predicate: &FieldPredicate,
    instance: &ResourceInstance,
) -> bool {
    match predicate {
        FieldPredicate::Equals(expected) => instance.field_equals(field, expected),
        FieldPredicate::OneOf { values } => values
            .iter()
            .any(|expected| instance.field_equals(field, expected)),
    }
}
