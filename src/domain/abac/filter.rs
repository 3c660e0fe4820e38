use crate::domain::resource::ResourceInstance;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Boolean filter over document fields, handed to the storage collaborator.
///
/// The combinators fold `True`/`False` away as they build, so a filter that can
/// never match is the literal `False`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FilterExpr {
    True,
    False,
    Or { operands: Vec<FilterExpr> },
    And { operands: Vec<FilterExpr> },
    Not { operand: Box<FilterExpr> },
    FieldIn { field: String, values: BTreeSet<String> },
    FieldEquals { field: String, value: Value },
}

impl FilterExpr {
    pub fn field_in<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return FilterExpr::False;
        }
        FilterExpr::FieldIn {
            field: field.into(),
            values,
        }
    }

    pub fn field_equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterExpr::FieldEquals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn or(self, other: FilterExpr) -> FilterExpr {
        use FilterExpr::*;
        match (self, other) {
            (True, _) | (_, True) => True,
            (False, expr) | (expr, False) => expr,
            (Or { mut operands }, Or { operands: rest }) => {
                operands.extend(rest);
                Or { operands }
            }
            (Or { mut operands }, expr) => {
                operands.push(expr);
                Or { operands }
            }
            (expr, Or { operands: rest }) => {
                let mut operands = Vec::with_capacity(rest.len() + 1);
                operands.push(expr);
                operands.extend(rest);
                Or { operands }
            }
            (lhs, rhs) => Or {
                operands: vec![lhs, rhs],
            },
        }
    }

    pub fn and(self, other: FilterExpr) -> FilterExpr {
        use FilterExpr::*;
        match (self, other) {
            (False, _) | (_, False) => False,
            (True, expr) | (expr, True) => expr,
            (And { mut operands }, And { operands: rest }) => {
                operands.extend(rest);
                And { operands }
            }
            (And { mut operands }, expr) => {
                operands.push(expr);
                And { operands }
            }
            (expr, And { operands: rest }) => {
                let mut operands = Vec::with_capacity(rest.len() + 1);
                operands.push(expr);
                operands.extend(rest);
                And { operands }
            }
            (lhs, rhs) => And {
                operands: vec![lhs, rhs],
            },
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> FilterExpr {
        match self {
            FilterExpr::True => FilterExpr::False,
            FilterExpr::False => FilterExpr::True,
            FilterExpr::Not { operand } => *operand,
            expr => FilterExpr::Not {
                operand: Box::new(expr),
            },
        }
    }

    /// Conjunction of all expressions; `True` when empty.
    pub fn all<I>(exprs: I) -> FilterExpr
    where
        I: IntoIterator<Item = FilterExpr>,
    {
        exprs.into_iter().fold(FilterExpr::True, FilterExpr::and)
    }

    /// Disjunction of all expressions; `False` when empty.
    pub fn any<I>(exprs: I) -> FilterExpr
    where
        I: IntoIterator<Item = FilterExpr>,
    {
        exprs.into_iter().fold(FilterExpr::False, FilterExpr::or)
    }

    pub fn is_true(&self) -> bool {
        matches!(self, FilterExpr::True)
    }

    pub fn is_false(&self) -> bool {
        matches!(self, FilterExpr::False)
    }

    /// Reference semantics of the filter against one document. Storage
    /// translations must agree with this.
    pub fn evaluate(&self, instance: &ResourceInstance) -> bool {
        match self {
            FilterExpr::True => true,
            FilterExpr::False => false,
            FilterExpr::Or { operands } => operands.iter().any(|expr| expr.evaluate(instance)),
            FilterExpr::And { operands } => operands.iter().all(|expr| expr.evaluate(instance)),
            FilterExpr::Not { operand } => !operand.evaluate(instance),
            FilterExpr::FieldIn { field, values } => instance.field_in(field, values),
            FilterExpr::FieldEquals { field, value } => instance.field_equals(field, value),
        }
    }
}
