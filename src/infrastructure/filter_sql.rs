//! Translation of [`FilterExpr`] into a Postgres predicate over the JSONB
//! `fields` column of the `resources` table.
//!
//! Every leaf renders as a two-valued predicate (never SQL `NULL`) so that
//! `NOT` keeps the semantics of [`FilterExpr::evaluate`] on documents where
//! the field is absent.
//!
//! Equality compares the canonical `jsonb` text of both sides rather than the
//! `jsonb` values. `jsonb` equality is numeric (`1 = 1.0`) while document
//! equality is not, and the text form keeps the numeric scale.

use crate::domain::abac::FilterExpr;
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};

pub fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &FilterExpr) {
    match filter {
        FilterExpr::True => {
            qb.push("TRUE");
        }
        FilterExpr::False => {
            qb.push("FALSE");
        }
        FilterExpr::And { operands } => push_junction(qb, operands, " AND ", "TRUE"),
        FilterExpr::Or { operands } => push_junction(qb, operands, " OR ", "FALSE"),
        FilterExpr::Not { operand } => {
            qb.push("NOT (");
            push_filter(qb, operand);
            qb.push(")");
        }
        FilterExpr::FieldEquals { field, value } => {
            qb.push("COALESCE((fields -> ");
            qb.push_bind(field.clone());
            qb.push(")::text = (");
            qb.push_bind(Json(value.clone()));
            qb.push(")::text, FALSE)");
        }
        FilterExpr::FieldIn { field, values } => {
            qb.push("COALESCE(jsonb_typeof(fields -> ");
            qb.push_bind(field.clone());
            qb.push(") = 'string' AND (fields ->> ");
            qb.push_bind(field.clone());
            qb.push(") = ANY(");
            qb.push_bind(values.iter().cloned().collect::<Vec<String>>());
            qb.push("), FALSE)");
        }
    }
}

fn push_junction(
    qb: &mut QueryBuilder<'_, Postgres>,
    operands: &[FilterExpr],
    separator: &str,
    empty: &str,
) {
    if operands.is_empty() {
        qb.push(empty);
        return;
    }
    qb.push("(");
    for (i, operand) in operands.iter().enumerate() {
        if i > 0 {
            qb.push(separator);
        }
        push_filter(qb, operand);
    }
    qb.push(")");
}
