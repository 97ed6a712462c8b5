use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

// ============================================================================
// Zone / Shop Directory - consumed collaborator
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShopStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone)]
pub struct ShopInfo {
    pub shop_id: Uuid,
    pub name: String,
    pub operating_hours: String,
}

#[async_trait]
pub trait ZoneDirectory: Send + Sync {
    /// `Ok(None)` means the zone does not exist.
    async fn zone_status(&self, zone_id: Uuid) -> anyhow::Result<Option<ZoneStatus>>;

    async fn shop_status(&self, shop_id: Uuid) -> anyhow::Result<ShopStatus>;

    /// Shops currently accepting orders in this zone.
    async fn active_shops_in_zone(&self, zone_id: Uuid) -> anyhow::Result<Vec<ShopInfo>>;
}

/// In-memory directory for tests and the demo binary.
#[derive(Default)]
pub struct MemoryDirectory {
    inner: RwLock<DirectoryState>,
}

#[derive(Default)]
struct DirectoryState {
    zones: HashMap<Uuid, ZoneStatus>,
    shops: HashMap<Uuid, ShopEntry>,
}

struct ShopEntry {
    zone_id: Uuid,
    info: ShopInfo,
    status: ShopStatus,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_zone(&self, zone_id: Uuid, status: ZoneStatus) {
        self.inner
            .write()
            .expect("directory lock poisoned")
            .zones
            .insert(zone_id, status);
    }

    pub fn add_shop(&self, zone_id: Uuid, shop_id: Uuid, name: &str, status: ShopStatus) {
        self.inner
            .write()
            .expect("directory lock poisoned")
            .shops
            .insert(
                shop_id,
                ShopEntry {
                    zone_id,
                    info: ShopInfo {
                        shop_id,
                        name: name.to_string(),
                        operating_hours: "10:00-22:00".to_string(),
                    },
                    status,
                },
            );
    }

    pub fn set_shop_status(&self, shop_id: Uuid, status: ShopStatus) {
        if let Some(entry) = self
            .inner
            .write()
            .expect("directory lock poisoned")
            .shops
            .get_mut(&shop_id)
        {
            entry.status = status;
        }
    }
}

#[async_trait]
impl ZoneDirectory for MemoryDirectory {
    async fn zone_status(&self, zone_id: Uuid) -> anyhow::Result<Option<ZoneStatus>> {
        Ok(self
            .inner
            .read()
            .expect("directory lock poisoned")
            .zones
            .get(&zone_id)
            .copied())
    }

    async fn shop_status(&self, shop_id: Uuid) -> anyhow::Result<ShopStatus> {
        Ok(self
            .inner
            .read()
            .expect("directory lock poisoned")
            .shops
            .get(&shop_id)
            .map(|e| e.status)
            .unwrap_or(ShopStatus::Inactive))
    }

    async fn active_shops_in_zone(&self, zone_id: Uuid) -> anyhow::Result<Vec<ShopInfo>> {
        Ok(self
            .inner
            .read()
            .expect("directory lock poisoned")
            .shops
            .values()
            .filter(|e| e.zone_id == zone_id && e.status == ShopStatus::Active)
            .map(|e| e.info.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_active_shops_filters_inactive_and_foreign() {
        let directory = MemoryDirectory::new();
        let zone = Uuid::new_v4();
        let other_zone = Uuid::new_v4();
        let active = Uuid::new_v4();
        let inactive = Uuid::new_v4();
        let foreign = Uuid::new_v4();

        directory.add_zone(zone, ZoneStatus::Open);
        directory.add_shop(zone, active, "Wok Station", ShopStatus::Active);
        directory.add_shop(zone, inactive, "Juice Bar", ShopStatus::Inactive);
        directory.add_shop(other_zone, foreign, "Bakery", ShopStatus::Active);

        let shops = directory.active_shops_in_zone(zone).await.unwrap();
        assert_eq!(shops.len(), 1);
        assert_eq!(shops[0].shop_id, active);

        assert_eq!(
            directory.shop_status(inactive).await.unwrap(),
            ShopStatus::Inactive
        );
        // Unknown shop reads as inactive.
        assert_eq!(
            directory.shop_status(Uuid::new_v4()).await.unwrap(),
            ShopStatus::Inactive
        );
    }
}
