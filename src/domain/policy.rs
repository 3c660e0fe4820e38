use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Outcome a statement grants when it applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Allow,
    Deny,
}

/// Which instances of a resource type a statement covers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceMatch {
    #[default]
    Wildcard,
    ExplicitIds { ids: BTreeSet<String> },
}

impl ResourceMatch {
    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ResourceMatch::ExplicitIds {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }
}

/// Predicate on a single instance field.
///
/// `{"$in": [..]}` holds when the field equals any listed value; every other
/// JSON value is compared structurally. A malformed `$in` object falls through
/// to `Equals` and therefore only matches an identical object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldPredicate {
    OneOf {
        #[serde(rename = "$in")]
        values: Vec<Value>,
    },
    Equals(Value),
}

/// Conjunction of field predicates attached to a statement.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionExpr {
    fields: BTreeMap<String, FieldPredicate>,
}

impl ConditionExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_equals(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields
            .insert(field.into(), FieldPredicate::Equals(value.into()));
        self
    }

    pub fn with_one_of<I, V>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.fields.insert(
            field.into(),
            FieldPredicate::OneOf {
                values: values.into_iter().map(Into::into).collect(),
            },
        );
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldPredicate)> {
        self.fields.iter().map(|(field, predicate)| (field.as_str(), predicate))
    }
}

/// A single permission statement as loaded from a policy document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyStatement {
    pub name: String,
    pub effect: Effect,
    pub actions: Vec<String>,
    pub resource_type: String,
    #[serde(default)]
    pub resource_match: ResourceMatch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionExpr>,
}

impl PolicyStatement {
    pub fn new<I, S>(
        name: impl Into<String>,
        effect: Effect,
        resource_type: impl Into<String>,
        actions: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            effect,
            actions: actions.into_iter().map(Into::into).collect(),
            resource_type: resource_type.into(),
            resource_match: ResourceMatch::Wildcard,
            condition: None,
        }
    }

    /// Allow statement over every instance of `resource_type`.
    pub fn allow<I, S>(name: impl Into<String>, resource_type: impl Into<String>, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, Effect::Allow, resource_type, actions)
    }

    /// Deny statement over every instance of `resource_type`.
    pub fn deny<I, S>(name: impl Into<String>, resource_type: impl Into<String>, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, Effect::Deny, resource_type, actions)
    }

    /// Narrows the statement to the given instance ids.
    pub fn with_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resource_match = ResourceMatch::ids(ids);
        self
    }

    pub fn with_condition(mut self, condition: ConditionExpr) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// Stored policy document: a named, ordered list of statements.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub statements: Vec<PolicyStatement>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_statement_builder() {
        let statement = PolicyStatement::deny("no-archived", "Group", ["Group:GetGroup"])
            .with_ids(["g1", "g2"])
            .with_condition(ConditionExpr::new().with_equals("status", "archived"));

        assert_eq!(statement.effect, Effect::Deny);
        assert_eq!(statement.actions, vec!["Group:GetGroup".to_string()]);
        assert_eq!(statement.resource_match, ResourceMatch::ids(["g1", "g2"]));
        assert!(statement.condition.is_some());
    }

    #[test]
    fn test_statement_deserializes_with_defaults() {
        let statement: PolicyStatement = serde_json::from_value(json!({
            "name": "list-groups",
            "effect": "allow",
            "actions": ["Group:ListGroups"],
            "resource_type": "Group"
        }))
        .unwrap();

        assert_eq!(statement.resource_match, ResourceMatch::Wildcard);
        assert!(statement.condition.is_none());
    }

    #[test]
    fn test_condition_parses_in_operator_and_literals() {
        let condition: ConditionExpr = serde_json::from_value(json!({
            "name": "Foo",
            "status": {"$in": ["active", "pending"]}
        }))
        .unwrap();

        let predicates: Vec<_> = condition.iter().collect();
        assert_eq!(predicates.len(), 2);
        assert_eq!(predicates[0], ("name", &FieldPredicate::Equals(json!("Foo"))));
        assert_eq!(
            predicates[1],
            (
                "status",
                &FieldPredicate::OneOf {
                    values: vec![json!("active"), json!("pending")]
                }
            )
        );
    }

    #[test]
    fn test_malformed_in_operator_is_kept_as_literal() {
        let condition: ConditionExpr =
            serde_json::from_value(json!({"status": {"$in": "active"}})).unwrap();
        let (_, predicate) = condition.iter().next().unwrap();
        assert_eq!(
            predicate,
            &FieldPredicate::Equals(json!({"$in": "active"}))
        );
    }

    #[test]
    fn test_explicit_ids_serialization() {
        let value = serde_json::to_value(ResourceMatch::ids(["b", "a"])).unwrap();
        assert_eq!(value, json!({"type": "explicit_ids", "ids": ["a", "b"]}));
    }
}
