use super::rule::RuleSet;
use crate::domain::policy::Effect;
use crate::domain::resource::ResourceInstance;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }
}

impl From<Effect> for Decision {
    fn from(effect: Effect) -> Self {
        match effect {
            Effect::Allow => Decision::Allow,
            Effect::Deny => Decision::Deny,
        }
    }
}

/// Point decision for one instance.
///
/// The last declared rule that applies wins; if none applies the answer is
/// `Deny`. There is no deny-overrides rule: a later `Allow` re-opens what an
/// earlier `Deny` closed and vice versa.
pub fn decide(
    rules: &RuleSet,
    action: &str,
    resource_type: &str,
    instance: &ResourceInstance,
) -> Decision {
    let matched = rules
        .iter()
        .rev()
        .find(|rule| rule.applies(action, resource_type, Some(instance)));

    match matched {
        Some(rule) => {
            debug!(
                action,
                resource_type,
                statement = %rule.statement,
                effect = ?rule.effect,
                "rule matched"
            );
            Decision::from(rule.effect)
        }
        None => {
            debug!(action, resource_type, "no rule matched, denying");
            Decision::Deny
        }
    }
}
