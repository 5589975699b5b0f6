use helpdesk_shared::{new_id, Sector, SectorStatus, Unit, UnitStatus};
use serde::Deserialize;

use super::Registry;
use crate::error::{ApiResult, AppError, ValidationBuilder};
use crate::validation::{string, Search};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnitInput {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub responsible: Option<String>,
    pub status: Option<UnitStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SectorInput {
    pub name: Option<String>,
    pub unit_id: Option<String>,
    pub responsible: Option<String>,
    pub status: Option<SectorStatus>,
}

impl UnitInput {
    fn into_unit(self, id: String) -> ApiResult<Unit> {
        let mut errors = ValidationBuilder::new();
        let name = string::required(self.name.as_deref(), "name", "Unit name is required", &mut errors);
        string::max_length(self.name.as_deref(), "name", 120, &mut errors);
        errors.finish()?;

        Ok(Unit {
            id,
            name: name.unwrap_or_default(),
            address: string::optional(self.address),
            phone: string::optional(self.phone),
            responsible: string::optional(self.responsible),
            status: self.status.unwrap_or_default(),
        })
    }
}

impl Registry {
    /// Replace all units and sectors (startup seeding)
    pub async fn load_units(&self, units: Vec<Unit>, sectors: Vec<Sector>) {
        *self.units.write().await = units;
        *self.sectors.write().await = sectors;
    }

    pub async fn list_units(&self, search: Option<&str>) -> Vec<Unit> {
        let search = Search::new(search);
        self.units
            .read()
            .await
            .iter()
            .filter(|u| search.matches([u.name.as_str()]))
            .cloned()
            .collect()
    }

    pub async fn get_unit(&self, id: &str) -> ApiResult<Unit> {
        self.units
            .read()
            .await
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| AppError::not_found("Unit"))
    }

    pub async fn create_unit(&self, input: UnitInput) -> ApiResult<Unit> {
        let unit = input.into_unit(new_id())?;
        self.units.write().await.push(unit.clone());
        tracing::info!(unit_id = %unit.id, "unit created");
        Ok(unit)
    }

    pub async fn update_unit(&self, id: &str, input: UnitInput) -> ApiResult<Unit> {
        let updated = input.into_unit(id.to_string())?;
        let mut units = self.units.write().await;
        let unit = units
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::not_found("Unit"))?;
        *unit = updated.clone();
        Ok(updated)
    }

    /// Units that still own sectors or assets cannot be removed.
    pub async fn delete_unit(&self, id: &str) -> ApiResult<()> {
        let mut units = self.units.write().await;
        let sectors = self.sectors.read().await;
        let assets = self.assets.read().await;

        if !units.iter().any(|u| u.id == id) {
            return Err(AppError::not_found("Unit"));
        }
        if sectors.iter().any(|s| s.unit_id == id) || assets.iter().any(|a| a.unit_id == id) {
            return Err(AppError::conflict(
                "Unit still has sectors or assets; remove them first",
            ));
        }

        units.retain(|u| u.id != id);
        tracing::info!(unit_id = %id, "unit deleted");
        Ok(())
    }

    pub async fn list_sectors(&self, search: Option<&str>, unit_id: Option<&str>) -> Vec<Sector> {
        let search = Search::new(search);
        self.sectors
            .read()
            .await
            .iter()
            .filter(|s| unit_id.map_or(true, |id| s.unit_id == id))
            .filter(|s| search.matches([s.name.as_str()]))
            .cloned()
            .collect()
    }

    pub async fn get_sector(&self, id: &str) -> ApiResult<Sector> {
        self.sectors
            .read()
            .await
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| AppError::not_found("Sector"))
    }

    async fn build_sector(&self, id: String, input: SectorInput) -> ApiResult<Sector> {
        let mut errors = ValidationBuilder::new();
        let name = string::required(input.name.as_deref(), "name", "Sector name is required", &mut errors);
        let unit_id = string::required(input.unit_id.as_deref(), "unit_id", "Select a unit", &mut errors);
        if let Some(unit_id) = &unit_id {
            if !self.units.read().await.iter().any(|u| &u.id == unit_id) {
                errors.push("unit_id", "Unit does not exist");
            }
        }
        errors.finish()?;

        Ok(Sector {
            id,
            name: name.unwrap_or_default(),
            unit_id: unit_id.unwrap_or_default(),
            responsible: string::optional(input.responsible),
            status: input.status.unwrap_or_default(),
        })
    }

    pub async fn create_sector(&self, input: SectorInput) -> ApiResult<Sector> {
        let sector = self.build_sector(new_id(), input).await?;
        self.sectors.write().await.push(sector.clone());
        tracing::info!(sector_id = %sector.id, unit_id = %sector.unit_id, "sector created");
        Ok(sector)
    }

    pub async fn update_sector(&self, id: &str, input: SectorInput) -> ApiResult<Sector> {
        let updated = self.build_sector(id.to_string(), input).await?;
        let mut sectors = self.sectors.write().await;
        let sector = sectors
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| AppError::not_found("Sector"))?;
        *sector = updated.clone();
        Ok(updated)
    }

    pub async fn delete_sector(&self, id: &str) -> ApiResult<()> {
        let mut sectors = self.sectors.write().await;
        let assets = self.assets.read().await;

        if !sectors.iter().any(|s| s.id == id) {
            return Err(AppError::not_found("Sector"));
        }
        if assets.iter().any(|a| a.sector_id.as_deref() == Some(id)) {
            return Err(AppError::conflict("Sector still has assets; move them first"));
        }

        sectors.retain(|s| s.id != id);
        Ok(())
    }
}
