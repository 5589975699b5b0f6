use helpdesk_shared::{new_id, ConnectionStatus, ConnectionType, RemoteAccess};
use serde::Deserialize;

use super::Registry;
use crate::error::{ApiResult, AppError, ValidationBuilder};
use crate::validation::{string, Search};

/// Entry plus its sealed secret (AES-GCM, base64)
#[derive(Debug, Clone)]
pub(super) struct StoredRemoteAccess {
    entry: RemoteAccess,
    sealed_password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteAccessInput {
    pub name: Option<String>,
    pub connection_type: Option<ConnectionType>,
    pub access_id: Option<String>,
    /// On update, `None` keeps the current secret and an empty string clears it
    pub password: Option<String>,
    pub unit_id: Option<String>,
    pub status: Option<ConnectionStatus>,
}

impl Registry {
    fn seal(&self, password: Option<&str>) -> ApiResult<Option<String>> {
        match password {
            Some(p) if !p.is_empty() => Ok(Some(self.encryption.encrypt(p)?)),
            _ => Ok(None),
        }
    }

    async fn build_remote_access(&self, id: String, input: &RemoteAccessInput) -> ApiResult<RemoteAccess> {
        let mut errors = ValidationBuilder::new();
        let name = string::required(input.name.as_deref(), "name", "Name is required", &mut errors);
        let access_id = string::required(
            input.access_id.as_deref(),
            "access_id",
            "Access ID or address is required",
            &mut errors,
        );
        if input.connection_type.is_none() {
            errors.push("connection_type", "Select a connection type");
        }
        let unit_id = string::optional(input.unit_id.clone());
        if let Some(unit_id) = &unit_id {
            if !self.units.read().await.iter().any(|u| &u.id == unit_id) {
                errors.push("unit_id", "Unit does not exist");
            }
        }
        errors.finish()?;

        Ok(RemoteAccess {
            id,
            name: name.unwrap_or_default(),
            connection_type: input.connection_type.unwrap_or(ConnectionType::AnyDesk),
            access_id: access_id.unwrap_or_default(),
            unit_id,
            status: input.status.unwrap_or_default(),
            has_password: false,
        })
    }

    /// Seed entries with plaintext secrets, sealing them on the way in
    pub async fn load_remote_access(&self, entries: Vec<(RemoteAccess, Option<String>)>) -> ApiResult<()> {
        let mut stored = Vec::with_capacity(entries.len());
        for (mut entry, password) in entries {
            let sealed_password = self.seal(password.as_deref())?;
            entry.has_password = sealed_password.is_some();
            stored.push(StoredRemoteAccess { entry, sealed_password });
        }
        *self.remote_access.write().await = stored;
        Ok(())
    }

    /// Search matches name or access id
    pub async fn list_remote_access(&self, search: Option<&str>) -> Vec<RemoteAccess> {
        let search = Search::new(search);
        self.remote_access
            .read()
            .await
            .iter()
            .map(|s| &s.entry)
            .filter(|e| search.matches([e.name.as_str(), e.access_id.as_str()]))
            .cloned()
            .collect()
    }

    pub async fn get_remote_access(&self, id: &str) -> ApiResult<RemoteAccess> {
        self.remote_access
            .read()
            .await
            .iter()
            .find(|s| s.entry.id == id)
            .map(|s| s.entry.clone())
            .ok_or_else(|| AppError::not_found("Remote access"))
    }

    pub async fn create_remote_access(&self, input: RemoteAccessInput) -> ApiResult<RemoteAccess> {
        let mut entry = self.build_remote_access(new_id(), &input).await?;
        let sealed_password = self.seal(input.password.as_deref())?;
        entry.has_password = sealed_password.is_some();

        self.remote_access.write().await.push(StoredRemoteAccess {
            entry: entry.clone(),
            sealed_password,
        });
        tracing::info!(remote_access_id = %entry.id, "remote access entry created");
        Ok(entry)
    }

    pub async fn update_remote_access(&self, id: &str, input: RemoteAccessInput) -> ApiResult<RemoteAccess> {
        let mut entry = self.build_remote_access(id.to_string(), &input).await?;
        let new_secret = match input.password.as_deref() {
            None => None,
            Some(p) => Some(self.seal(Some(p))?),
        };

        let mut stored = self.remote_access.write().await;
        let current = stored
            .iter_mut()
            .find(|s| s.entry.id == id)
            .ok_or_else(|| AppError::not_found("Remote access"))?;

        if let Some(sealed) = new_secret {
            current.sealed_password = sealed;
        }
        entry.has_password = current.sealed_password.is_some();
        current.entry = entry.clone();
        Ok(entry)
    }

    pub async fn delete_remote_access(&self, id: &str) -> ApiResult<()> {
        let mut stored = self.remote_access.write().await;
        let before = stored.len();
        stored.retain(|s| s.entry.id != id);
        if stored.len() == before {
            return Err(AppError::not_found("Remote access"));
        }
        Ok(())
    }

    /// Decrypt the stored secret. Callers must audit the access.
    pub async fn reveal_password(&self, id: &str) -> ApiResult<Option<String>> {
        let sealed = {
            let stored = self.remote_access.read().await;
            stored
                .iter()
                .find(|s| s.entry.id == id)
                .ok_or_else(|| AppError::not_found("Remote access"))?
                .sealed_password
                .clone()
        };

        match sealed {
            Some(sealed) => Ok(Some(self.encryption.decrypt(&sealed)?)),
            None => Ok(None),
        }
    }
}
