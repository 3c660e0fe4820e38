use super::{RepoResult, ResourceStore, StoreError};
use crate::domain::resource::ResourceInstance;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Seed file layout: resource type → documents of that type.
pub type SeedDocuments = BTreeMap<String, Vec<ResourceInstance>>;

/// Loads documents into the store, skipping ones that already exist.
/// Returns how many were inserted.
pub async fn load_documents(store: &dyn ResourceStore, documents: SeedDocuments) -> RepoResult<usize> {
    let mut inserted = 0;
    for (resource_type, docs) in documents {
        for doc in docs {
            match store.insert(&resource_type, doc).await {
                Ok(_) => inserted += 1,
                Err(StoreError::Conflict { id, .. }) => {
                    warn!(resource_type = %resource_type, id = %id, "seed document already present, skipping");
                }
                Err(e) => return Err(e),
            }
        }
    }
    Ok(inserted)
}

pub async fn load_seed_file(store: &dyn ResourceStore, path: &Path) -> RepoResult<usize> {
    let raw = tokio::fs::read_to_string(path).await?;
    let documents: SeedDocuments = serde_json::from_str(&raw)?;
    let inserted = load_documents(store, documents).await?;
    info!(path = %path.display(), inserted, "seed data loaded");
    Ok(inserted)
}
