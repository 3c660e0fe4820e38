//! Compiles a rule set into a [`FilterExpr`] for listing queries.
//!
//! The rules are folded in declaration order starting from `False`: an `Allow`
//! rule ORs its clause in, a `Deny` rule ANDs the negation of its clause. For
//! any document the outermost operation that its clause satisfies is the one
//! contributed by the last applicable rule, so the filter selects exactly the
//! documents [`decide`](super::evaluator::decide) allows.

use super::filter::FilterExpr;
use super::rule::{CompiledRule, RuleSet};
use crate::domain::policy::{ConditionExpr, Effect, FieldPredicate, ResourceMatch};
use crate::domain::resource::fields;
use tracing::debug;

pub fn compile(rules: &RuleSet, action: &str, resource_type: &str) -> FilterExpr {
    let filter = rules
        .iter()
        .filter(|rule| rule.applies(action, resource_type, None))
        .fold(FilterExpr::False, |filter, rule| {
            let clause = rule_clause(rule);
            match rule.effect {
                Effect::Allow => filter.or(clause),
                Effect::Deny => filter.and(clause.not()),
            }
        });
    debug!(action, resource_type, filter = ?filter, "compiled access filter");
    filter
}

fn rule_clause(rule: &CompiledRule) -> FilterExpr {
    let resource = match &rule.resource_match {
        ResourceMatch::Wildcard => FilterExpr::True,
        ResourceMatch::ExplicitIds { ids } => FilterExpr::field_in(fields::ID, ids.iter().cloned()),
    };
    match &rule.condition {
        Some(condition) => resource.and(condition_clause(condition)),
        None => resource,
    }
}

/// Filter equivalent of [`condition::matches`](super::condition::matches).
pub fn condition_clause(condition: &ConditionExpr) -> FilterExpr {
    FilterExpr::all(condition.iter().map(|(field, predicate)| match predicate {
        FieldPredicate::Equals(value) => FilterExpr::field_equals(field, value.clone()),
        FieldPredicate::OneOf { values } => FilterExpr::any(
            values
                .iter()
                .map(|value| FilterExpr::field_equals(field, value.clone())),
        ),
    }))
}
