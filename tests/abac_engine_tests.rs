use access_control_service::domain::abac::compiler::compile;
use access_control_service::domain::abac::evaluator::decide;
use access_control_service::domain::abac::{AbilityAggregator, Decision, RuleSet};
use access_control_service::domain::error::AuthzError;
use access_control_service::domain::policy::{ConditionExpr, PolicyStatement};
use access_control_service::domain::principal::{GroupGrant, PrincipalIdentity, RoleGrant};
use access_control_service::domain::resource::{ResourceInstance, ResourceKinds};
use access_control_service::domain::tenant::TenantContext;
use proptest::prelude::*;
use serde_json::{Value, json};

const LIST: &str = "Group:ListGroups";
const GET: &str = "Group:GetGroup";
const IDS: [&str; 4] = ["g1", "g2", "g3", "g4"];
const NAMES: [&str; 3] = ["Foo", "Bar", "Baz"];
const KINDS: [&str; 2] = ["team", "project"];
const UNITS: [&str; 2] = ["unit1", "unit2"];

fn levels() -> Vec<Value> {
    vec![json!(1), json!(1.0), json!(2), json!("1")]
}

fn group(id: &str, name: &str, unit: &str) -> ResourceInstance {
    ResourceInstance::new()
        .with("id", id)
        .with("name", name)
        .with("organization_id", "org1")
        .with("unit_id", unit)
}

fn principal_with(statements: Vec<PolicyStatement>) -> PrincipalIdentity {
    PrincipalIdentity::builder("user1", TenantContext::new("org1", "unit1"))
        .statements(statements)
        .build()
}

// ===== POINT EVALUATION =====

#[test]
fn test_empty_rule_set_denies_everything() {
    let rules = RuleSet::new();
    let doc = group("g1", "Foo", "unit1");

    assert_eq!(decide(&rules, LIST, "Group", &doc), Decision::Deny);
    assert!(compile(&rules, LIST, "Group").is_false());
}

#[test]
fn test_later_rule_overrides_earlier_one() {
    let allow = PolicyStatement::allow("allow", "Group", [GET]);
    let deny = PolicyStatement::deny("deny", "Group", [GET]);
    let doc = group("g1", "Foo", "unit1");

    let allow_then_deny = RuleSet::from_statements(&[allow.clone(), deny.clone()]);
    let deny_then_allow = RuleSet::from_statements(&[deny, allow]);

    assert_eq!(decide(&allow_then_deny, GET, "Group", &doc), Decision::Deny);
    assert_eq!(decide(&deny_then_allow, GET, "Group", &doc), Decision::Allow);
}

#[test]
fn test_rule_for_other_action_or_type_is_ignored() {
    let rules = RuleSet::from_statements(&[
        PolicyStatement::allow("get", "Group", [GET]),
        PolicyStatement::allow("policies", "Policy", ["Policy:ListPolicies"]),
    ]);
    let doc = group("g1", "Foo", "unit1");

    assert_eq!(decide(&rules, LIST, "Group", &doc), Decision::Deny);
    assert_eq!(decide(&rules, "Policy:ListPolicies", "Group", &doc), Decision::Deny);
    assert_eq!(decide(&rules, GET, "Group", &doc), Decision::Allow);
}

#[test]
fn test_decisions_are_deterministic() {
    let rules = RuleSet::from_statements(&[
        PolicyStatement::allow("list", "Group", [LIST]),
        PolicyStatement::deny("hide", "Group", [LIST]).with_ids(["g2"]),
    ]);
    let doc = group("g2", "Foo", "unit1");

    let first = decide(&rules, LIST, "Group", &doc);
    for _ in 0..10 {
        assert_eq!(decide(&rules, LIST, "Group", &doc), first);
    }
}

#[test]
fn test_condition_narrows_allow_to_matching_documents() {
    let rules = RuleSet::from_statements(&[PolicyStatement::allow("foo", "Group", [LIST])
        .with_condition(ConditionExpr::new().with_equals("name", "Foo"))]);
    let docs = [
        group("g1", "Foo", "unit1"),
        group("g2", "Bar", "unit1"),
        group("g3", "Foo", "unit1"),
    ];

    let filter = compile(&rules, LIST, "Group");
    let allowed: Vec<_> = docs
        .iter()
        .filter(|doc| filter.evaluate(doc))
        .filter_map(|doc| doc.id())
        .collect();
    assert_eq!(allowed, vec!["g1", "g3"]);
}

// ===== TENANT SCOPE =====

#[test]
fn test_allow_never_crosses_tenant_boundary() {
    let ability = AbilityAggregator::default()
        .build(&principal_with(vec![
            PolicyStatement::allow("all", "Group", [GET, LIST]),
            PolicyStatement::allow("explicit", "Group", [GET]).with_ids(["g-far"]),
        ]))
        .unwrap();

    let local = group("g1", "Foo", "unit1");
    let sibling = group("g-far", "Foo", "unit2");
    let unscoped = ResourceInstance::new().with("id", "g-far");

    assert!(ability.can(GET, "Group", &local));
    assert!(!ability.can(GET, "Group", &sibling));
    assert!(!ability.can(GET, "Group", &unscoped));

    let filter = ability.access_filter(LIST, "Group");
    assert!(filter.evaluate(&local));
    assert!(!filter.evaluate(&sibling));
    assert!(!filter.evaluate(&unscoped));
}

#[test]
fn test_organization_scoped_type_is_bounded_by_organization() {
    let aggregator = AbilityAggregator::new(ResourceKinds::with_organization_scoped(["Unit", "Policy"]));
    let ability = aggregator
        .build(&principal_with(vec![PolicyStatement::allow(
            "read-policies",
            "Policy",
            ["Policy:GetPolicy"],
        )]))
        .unwrap();

    let same_org = ResourceInstance::new()
        .with("id", "p1")
        .with("organization_id", "org1")
        .with("unit_id", "unit2");
    let other_org = ResourceInstance::new()
        .with("id", "p2")
        .with("organization_id", "org2");

    assert!(ability.can("Policy:GetPolicy", "Policy", &same_org));
    assert!(!ability.can("Policy:GetPolicy", "Policy", &other_org));
}

// ===== ROLE ASSUMPTION =====

fn principal_with_role() -> PrincipalIdentity {
    PrincipalIdentity::builder("user1", TenantContext::new("org1", "unit1"))
        .statements(vec![PolicyStatement::allow(
            "policies",
            "Policy",
            ["Policy:ListPolicies"],
        )])
        .group(GroupGrant {
            group_id: "g-editors".into(),
            statements: vec![PolicyStatement::allow("edit", "Group", ["Group:UpdateGroup"])],
        })
        .role(RoleGrant {
            role_id: "r-auditor".into(),
            tenant: TenantContext::new("org1", "unit2"),
            statements: vec![PolicyStatement::allow("list", "Group", [LIST])],
        })
        .build()
}

#[test]
fn test_assumed_role_uses_only_role_statements_and_tenant() {
    let aggregator = AbilityAggregator::default();
    let principal = principal_with_role();
    let assumed = principal.assume_role("r-auditor").unwrap();

    let normal = aggregator.build(&principal).unwrap();
    let acting = aggregator.build(&assumed).unwrap();

    assert_eq!(acting.tenant().unit_id, "unit2");
    assert_eq!(acting.rules().len(), 1);

    let policy = ResourceInstance::new()
        .with("id", "p1")
        .with("unit_id", "unit2");
    assert!(!acting.can("Policy:ListPolicies", "Policy", &policy));
    assert!(!acting.can("Group:UpdateGroup", "Group", &group("g1", "Foo", "unit2")));
    assert!(acting.can(LIST, "Group", &group("g1", "Foo", "unit2")));

    // normal mode still sees its home unit only, role statements included
    assert!(normal.can(LIST, "Group", &group("g1", "Foo", "unit1")));
    assert!(!normal.can(LIST, "Group", &group("g1", "Foo", "unit2")));
}

#[test]
fn test_assuming_unassigned_role_fails() {
    let principal = principal_with_role();
    let err = principal.assume_role("r-admin").unwrap_err();
    assert!(matches!(err, AuthzError::RoleNotAssigned { role_id } if role_id == "r-admin"));
}

// ===== FILTER / POINT EQUIVALENCE =====

fn condition_strategy() -> impl Strategy<Value = Option<ConditionExpr>> {
    prop_oneof![
        Just(None),
        prop::sample::select(NAMES.to_vec())
            .prop_map(|name| Some(ConditionExpr::new().with_equals("name", name))),
        prop::sample::subsequence(NAMES.to_vec(), 0..=NAMES.len())
            .prop_map(|names| Some(ConditionExpr::new().with_one_of("name", names))),
        (
            prop::sample::select(NAMES.to_vec()),
            prop::sample::select(KINDS.to_vec()),
        )
            .prop_map(|(name, kind)| {
                Some(
                    ConditionExpr::new()
                        .with_equals("name", name)
                        .with_equals("kind", kind),
                )
            }),
        prop::sample::select(levels())
            .prop_map(|level| Some(ConditionExpr::new().with_equals("level", level))),
        prop::sample::subsequence(levels(), 0..=2)
            .prop_map(|levels| Some(ConditionExpr::new().with_one_of("level", levels))),
    ]
}

fn statement_strategy() -> impl Strategy<Value = PolicyStatement> {
    (
        any::<bool>(),
        prop::sample::select(vec![LIST, GET]),
        prop::sample::select(vec!["Group", "Policy"]),
        prop::option::of(prop::sample::subsequence(IDS.to_vec(), 0..=IDS.len())),
        condition_strategy(),
    )
        .prop_map(|(allow, action, resource_type, ids, condition)| {
            let mut statement = if allow {
                PolicyStatement::allow("generated", resource_type, [action])
            } else {
                PolicyStatement::deny("generated", resource_type, [action])
            };
            if let Some(ids) = ids {
                statement = statement.with_ids(ids);
            }
            if let Some(condition) = condition {
                statement = statement.with_condition(condition);
            }
            statement
        })
}

fn document_strategy() -> impl Strategy<Value = ResourceInstance> {
    (
        prop::option::of(prop::sample::select(vec!["g1", "g2", "g3", "g4", "g5"])),
        prop::option::of(prop::sample::select(NAMES.to_vec())),
        prop::option::of(prop::sample::select(KINDS.to_vec())),
        prop::option::of(prop::sample::select(levels())),
        prop::sample::select(UNITS.to_vec()),
    )
        .prop_map(|(id, name, kind, level, unit)| {
            let mut doc = ResourceInstance::new()
                .with("organization_id", "org1")
                .with("unit_id", unit);
            if let Some(id) = id {
                doc.set("id", id);
            }
            if let Some(name) = name {
                doc.set("name", name);
            }
            if let Some(kind) = kind {
                doc.set("kind", kind);
            }
            if let Some(level) = level {
                doc.set("level", level);
            }
            doc
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn compiled_filter_selects_exactly_the_allowed_documents(
        statements in prop::collection::vec(statement_strategy(), 0..8),
        docs in prop::collection::vec(document_strategy(), 1..12),
    ) {
        let rules = RuleSet::from_statements(&statements);
        for action in [LIST, GET] {
            let filter = compile(&rules, action, "Group");
            for doc in &docs {
                prop_assert_eq!(
                    filter.evaluate(doc),
                    decide(&rules, action, "Group", doc).is_allowed()
                );
            }
        }
    }

    #[test]
    fn scoped_filter_agrees_with_scoped_decision(
        statements in prop::collection::vec(statement_strategy(), 0..8),
        docs in prop::collection::vec(document_strategy(), 1..12),
    ) {
        let ability = AbilityAggregator::default()
            .build(&principal_with(statements))
            .unwrap();
        for action in [LIST, GET] {
            let filter = ability.access_filter(action, "Group");
            for doc in &docs {
                let allowed = ability.can(action, "Group", doc);
                prop_assert_eq!(filter.evaluate(doc), allowed);
                if doc.unit_id() != Some("unit1") {
                    prop_assert!(!allowed);
                }
            }
        }
    }
}
