use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

// ============================================================================
// Catalog Lookup - consumed collaborator
// ============================================================================
//
// The catalog itself (menu CRUD, pricing management) is an external system.
// The order engine only resolves a submitted cart line to its owning shop,
// availability flag, and current unit price.
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedItem {
    pub shop_id: Uuid,
    pub name: String,
    pub available: bool,
    /// Minor units (cents).
    pub unit_price: i64,
}

#[async_trait]
pub trait CatalogLookup: Send + Sync {
    /// Resolve a catalog reference. `Ok(None)` means the reference is
    /// unknown; transport failures surface as errors.
    async fn resolve_item(&self, reference: &str) -> anyhow::Result<Option<ResolvedItem>>;
}

/// In-memory catalog for tests and the demo binary.
#[derive(Default)]
pub struct MemoryCatalog {
    items: RwLock<HashMap<String, ResolvedItem>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, reference: &str, item: ResolvedItem) {
        self.items
            .write()
            .expect("catalog lock poisoned")
            .insert(reference.to_string(), item);
    }

    pub fn mark_unavailable(&self, reference: &str) {
        if let Some(item) = self
            .items
            .write()
            .expect("catalog lock poisoned")
            .get_mut(reference)
        {
            item.available = false;
        }
    }
}

#[async_trait]
impl CatalogLookup for MemoryCatalog {
    async fn resolve_item(&self, reference: &str) -> anyhow::Result<Option<ResolvedItem>> {
        Ok(self
            .items
            .read()
            .expect("catalog lock poisoned")
            .get(reference)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_catalog_resolution() {
        let catalog = MemoryCatalog::new();
        let shop_id = Uuid::new_v4();
        catalog.insert(
            "laksa-01",
            ResolvedItem {
                shop_id,
                name: "Curry Laksa".to_string(),
                available: true,
                unit_price: 780,
            },
        );

        let hit = catalog.resolve_item("laksa-01").await.unwrap().unwrap();
        assert_eq!(hit.shop_id, shop_id);
        assert!(hit.available);

        assert!(catalog.resolve_item("missing").await.unwrap().is_none());

        catalog.mark_unavailable("laksa-01");
        let hit = catalog.resolve_item("laksa-01").await.unwrap().unwrap();
        assert!(!hit.available);
    }
}
