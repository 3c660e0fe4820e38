//! Attribute-based access control engine.
//!
//! Everything here is pure and synchronous. The same [`RuleSet`] answers point
//! checks through [`evaluator::decide`] and listing queries through
//! [`compiler::compile`]; both are confined to the active tenant by
//! [`TenantScope`].

pub mod ability;
pub mod compiler;
pub mod condition;
pub mod evaluator;
pub mod filter;
pub mod rule;
pub mod tenant_scope;

pub use ability::{Ability, AbilityAggregator};
pub use evaluator::Decision;
pub use filter::FilterExpr;
pub use rule::{CompiledRule, RuleSet};
pub use tenant_scope::TenantScope;
