use super::condition;
use crate::domain::policy::{ConditionExpr, Effect, PolicyStatement, ResourceMatch};
use crate::domain::resource::{ResourceInstance, fields};

/// A policy statement narrowed to a single action.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledRule {
    pub statement: String,
    pub effect: Effect,
    pub action: String,
    pub resource_type: String,
    pub resource_match: ResourceMatch,
    pub condition: Option<ConditionExpr>,
}

impl CompiledRule {
    /// One rule per declared action, in declaration order.
    pub fn expand(statement: &PolicyStatement) -> impl Iterator<Item = CompiledRule> + '_ {
        statement.actions.iter().map(move |action| CompiledRule {
            statement: statement.name.clone(),
            effect: statement.effect,
            action: action.clone(),
            resource_type: statement.resource_type.clone(),
            resource_match: statement.resource_match.clone(),
            condition: statement.condition.clone(),
        })
    }

    /// True if the rule is about `action` on `resource_type` at all.
    pub fn targets(&self, action: &str, resource_type: &str) -> bool {
        self.resource_type == resource_type && self.action == action
    }

    /// Decides whether the rule applies.
    ///
    /// Without an instance only the action and type are checked; the id set
    /// and condition are left for the query compiler to turn into clauses.
    pub fn applies(
        &self,
        action: &str,
        resource_type: &str,
        instance: Option<&ResourceInstance>,
    ) -> bool {
        if !self.targets(action, resource_type) {
            return false;
        }
        let Some(instance) = instance else {
            return true;
        };
        let resource_matches = match &self.resource_match {
            ResourceMatch::Wildcard => true,
            ResourceMatch::ExplicitIds { ids } => instance.field_in(fields::ID, ids),
        };
        resource_matches && condition::matches(self.condition.as_ref(), instance)
    }
}

/// Ordered, flattened rules of a principal. Order is significant: later rules
/// take precedence over earlier ones.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_statements<'a, I>(statements: I) -> Self
    where
        I: IntoIterator<Item = &'a PolicyStatement>,
    {
        let mut rule_set = Self::new();
        rule_set.extend_from_statements(statements);
        rule_set
    }

    pub fn extend_from_statements<'a, I>(&mut self, statements: I)
    where
        I: IntoIterator<Item = &'a PolicyStatement>,
    {
        for statement in statements {
            self.rules.extend(CompiledRule::expand(statement));
        }
    }

    /// Rules in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, CompiledRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a CompiledRule;
    type IntoIter = std::slice::Iter<'a, CompiledRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
