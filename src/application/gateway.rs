use crate::domain::abac::{Ability, FilterExpr};
use crate::domain::error::AuthzError;
use crate::domain::resource::{
    ResourceInstance, ResourceVerb, action_name, fields, resource_types,
};
use crate::domain::tenant::TenantLevel;
use crate::infrastructure::ResourceStore;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Fields stamped by the gateway and never taken from the caller.
const RESERVED_FIELDS: [&str; 3] = [fields::ID, fields::UNIT_ID, fields::ORGANIZATION_ID];

/// Hierarchy fields of units, derived from the creating tenant.
const UNIT_HIERARCHY_FIELDS: [&str; 2] = [fields::PARENT_ID, fields::ANCESTRY];

fn reject_reserved(resource_type: &str, input: &Map<String, Value>) -> Result<(), AuthzError> {
    let hierarchy: &[&str] = if resource_type == resource_types::UNIT {
        &UNIT_HIERARCHY_FIELDS
    } else {
        &[]
    };
    match RESERVED_FIELDS
        .iter()
        .chain(hierarchy)
        .find(|field| input.contains_key(**field))
    {
        Some(field) => Err(AuthzError::InvalidInput(format!(
            "field \"{field}\" is managed by the server"
        ))),
        None => Ok(()),
    }
}

fn check_resource_type(resource_type: &str) -> Result<(), AuthzError> {
    if resource_type.is_empty() || !resource_type.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AuthzError::InvalidInput(format!(
            "invalid resource type \"{resource_type}\""
        )));
    }
    Ok(())
}

/// CRUD entry point for every resource type. Each operation derives its action
/// name from the verb and resource type and enforces it through the caller's
/// [`Ability`], tenant boundary included.
#[derive(Clone)]
pub struct ResourceGateway {
    store: Arc<dyn ResourceStore>,
}

impl ResourceGateway {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    /// Filter selecting the single document `id` among those `verb` is allowed on.
    fn scoped_lookup(
        ability: &Ability,
        resource_type: &str,
        verb: ResourceVerb,
        id: &str,
    ) -> FilterExpr {
        ability
            .access_filter(&action_name(resource_type, verb), resource_type)
            .and(FilterExpr::field_in(fields::ID, [id]))
    }

    #[instrument(skip(self, ability, input), fields(unit_id = %ability.tenant().unit_id))]
    pub async fn create(
        &self,
        ability: &Ability,
        resource_type: &str,
        input: Map<String, Value>,
    ) -> Result<ResourceInstance, AuthzError> {
        check_resource_type(resource_type)?;
        reject_reserved(resource_type, &input)?;

        let tenant = ability.tenant();
        let mut instance = ResourceInstance::from_fields(input);
        instance.set(fields::ID, Uuid::new_v4().to_string());
        instance.set(fields::ORGANIZATION_ID, tenant.organization_id.clone());
        if ability.tenant_level(resource_type) == TenantLevel::Unit {
            instance.set(fields::UNIT_ID, tenant.unit_id.clone());
        }
        if resource_type == resource_types::UNIT {
            instance.set(fields::PARENT_ID, tenant.unit_id.clone());
            instance.set(fields::ANCESTRY, tenant.child_ancestry());
        }

        ability.ensure(
            &action_name(resource_type, ResourceVerb::Create),
            resource_type,
            &instance,
        )?;
        let created = self.store.insert(resource_type, instance).await?;
        info!(id = created.id(), "resource created");
        Ok(created)
    }

    #[instrument(skip(self, ability), fields(unit_id = %ability.tenant().unit_id))]
    pub async fn get(
        &self,
        ability: &Ability,
        resource_type: &str,
        id: &str,
    ) -> Result<ResourceInstance, AuthzError> {
        check_resource_type(resource_type)?;
        let filter = Self::scoped_lookup(ability, resource_type, ResourceVerb::Get, id);
        self.store
            .find_one(resource_type, &filter)
            .await?
            .ok_or_else(|| AuthzError::not_found(resource_type, id))
    }

    /// Applies a merge patch. The patched document must still be allowed, so an
    /// update cannot move a record outside what the caller may update.
    #[instrument(skip(self, ability, patch), fields(unit_id = %ability.tenant().unit_id))]
    pub async fn update(
        &self,
        ability: &Ability,
        resource_type: &str,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<ResourceInstance, AuthzError> {
        check_resource_type(resource_type)?;
        reject_reserved(resource_type, &patch)?;

        let filter = Self::scoped_lookup(ability, resource_type, ResourceVerb::Update, id);
        let mut instance = self
            .store
            .find_one(resource_type, &filter)
            .await?
            .ok_or_else(|| AuthzError::not_found(resource_type, id))?;

        instance.merge_patch(patch);
        ability.ensure(
            &action_name(resource_type, ResourceVerb::Update),
            resource_type,
            &instance,
        )?;
        let updated = self.store.replace(resource_type, instance).await?;
        info!("resource updated");
        Ok(updated)
    }

    #[instrument(skip(self, ability), fields(unit_id = %ability.tenant().unit_id))]
    pub async fn delete(
        &self,
        ability: &Ability,
        resource_type: &str,
        id: &str,
    ) -> Result<(), AuthzError> {
        check_resource_type(resource_type)?;
        let filter = Self::scoped_lookup(ability, resource_type, ResourceVerb::Delete, id);
        match self.store.delete_matching(resource_type, &filter).await? {
            0 => Err(AuthzError::not_found(resource_type, id)),
            _ => {
                info!("resource deleted");
                Ok(())
            }
        }
    }

    /// Everything the caller may list, filtered by storage. A filter that
    /// folded to `FALSE` never reaches storage.
    #[instrument(skip(self, ability), fields(unit_id = %ability.tenant().unit_id))]
    pub async fn list(
        &self,
        ability: &Ability,
        resource_type: &str,
    ) -> Result<Vec<ResourceInstance>, AuthzError> {
        check_resource_type(resource_type)?;
        let filter = ability.access_filter(
            &action_name(resource_type, ResourceVerb::List),
            resource_type,
        );
        if filter.is_false() {
            debug!("nothing listable");
            return Ok(Vec::new());
        }
        Ok(self.store.find_many(resource_type, &filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::abac::AbilityAggregator;
    use crate::domain::policy::PolicyStatement;
    use crate::domain::principal::PrincipalIdentity;
    use crate::domain::tenant::TenantContext;
    use crate::infrastructure::InMemoryResourceStore;
    use serde_json::json;

    fn ability(statements: Vec<PolicyStatement>) -> Ability {
        let principal = PrincipalIdentity::builder("user1", TenantContext::new("org1", "unit1"))
            .statements(statements)
            .build();
        AbilityAggregator::default().build(&principal).unwrap()
    }

    fn input(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("object expected"),
        }
    }

    #[tokio::test]
    async fn test_create_stamps_id_and_tenant() {
        let gateway = ResourceGateway::new(Arc::new(InMemoryResourceStore::new()));
        let ability = ability(vec![PolicyStatement::allow(
            "create",
            "Group",
            ["Group:CreateGroup"],
        )]);

        let created = gateway
            .create(&ability, "Group", input(json!({"name": "Foo"})))
            .await
            .unwrap();
        assert!(created.id().is_some());
        assert_eq!(created.unit_id(), Some("unit1"));
        assert_eq!(created.organization_id(), Some("org1"));
    }

    #[tokio::test]
    async fn test_client_cannot_choose_reserved_fields() {
        let gateway = ResourceGateway::new(Arc::new(InMemoryResourceStore::new()));
        let ability = ability(vec![PolicyStatement::allow(
            "create",
            "Group",
            ["Group:CreateGroup"],
        )]);

        let err = gateway
            .create(&ability, "Group", input(json!({"unit_id": "unit2"})))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_create_denied_before_storage() {
        let store = Arc::new(InMemoryResourceStore::new());
        let gateway = ResourceGateway::new(store.clone());

        let err = gateway
            .create(&ability(vec![]), "Group", input(json!({"name": "Foo"})))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot execute \"Group:CreateGroup\" on \"Group\""
        );
        assert!(store.find_many("Group", &FilterExpr::True).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_child_unit_hierarchy() {
        let gateway = ResourceGateway::new(Arc::new(InMemoryResourceStore::new()));
        let ability = ability(vec![PolicyStatement::allow(
            "units",
            "Unit",
            ["Unit:CreateUnit", "Unit:GetUnit"],
        )]);

        let unit = gateway
            .create(&ability, "Unit", input(json!({"name": "Child"})))
            .await
            .unwrap();
        assert_eq!(unit.get("parent_id"), Some(&json!("unit1")));
        assert_eq!(unit.get("ancestry"), Some(&json!(["unit1"])));
        assert_eq!(unit.unit_id(), None);

        let fetched = gateway
            .get(&ability, "Unit", unit.id().unwrap())
            .await
            .unwrap();
        assert_eq!(fetched, unit);
    }

    #[tokio::test]
    async fn test_invalid_resource_type() {
        let gateway = ResourceGateway::new(Arc::new(InMemoryResourceStore::new()));
        let err = gateway
            .list(&ability(vec![]), "Group; DROP")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::InvalidInput(_)));
    }
}
