//! Reference-data registries: units, sectors, assets, remote-access
//! entries and the common-problem templates used by ticket creation.
//!
//! Registries live in process memory and are seeded at startup.
//! When more than one collection is locked, locks are taken in the order
//! units, sectors, assets.

pub mod assets;
pub mod remote_access;
pub mod units;

use helpdesk_shared::{Asset, CommonProblem, Sector, Unit};
use tokio::sync::RwLock;

use crate::error::{ApiResult, AppError};
use crate::services::encryption::EncryptionService;
use remote_access::StoredRemoteAccess;

pub use assets::AssetInput;
pub use remote_access::RemoteAccessInput;
pub use units::{SectorInput, UnitInput};

pub struct Registry {
    units: RwLock<Vec<Unit>>,
    sectors: RwLock<Vec<Sector>>,
    assets: RwLock<Vec<Asset>>,
    remote_access: RwLock<Vec<StoredRemoteAccess>>,
    problems: RwLock<Vec<CommonProblem>>,
    encryption: EncryptionService,
}

impl Registry {
    pub fn new(encryption: EncryptionService) -> Self {
        Self {
            units: RwLock::new(Vec::new()),
            sectors: RwLock::new(Vec::new()),
            assets: RwLock::new(Vec::new()),
            remote_access: RwLock::new(Vec::new()),
            problems: RwLock::new(Vec::new()),
            encryption,
        }
    }

    /// Replace the common-problem templates
    pub async fn load_problems(&self, problems: Vec<CommonProblem>) {
        *self.problems.write().await = problems;
    }

    pub async fn list_problems(&self) -> Vec<CommonProblem> {
        self.problems.read().await.clone()
    }

    pub async fn get_problem(&self, id: &str) -> ApiResult<CommonProblem> {
        self.problems
            .read()
            .await
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| AppError::not_found("Common problem"))
    }
}

#[cfg(test)]
pub(crate) fn test_registry() -> Registry {
    let encryption = EncryptionService::new("test_key_32_bytes_long_exactly!!")
        .expect("test key is 32 bytes");
    Registry::new(encryption)
}
