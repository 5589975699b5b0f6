use chrono::NaiveDate;
use helpdesk_shared::{new_id, Asset, AssetStatus};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::Registry;
use crate::error::{ApiResult, AppError, ValidationBuilder};
use crate::validation::{string, Search};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetInput {
    pub name: Option<String>,
    pub patrimony_id: Option<String>,
    pub category: Option<String>,
    pub status: Option<AssetStatus>,
    pub unit_id: Option<String>,
    pub sector_id: Option<String>,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub acquisition_date: Option<NaiveDate>,
    pub value: Option<Decimal>,
    pub warranty_date: Option<NaiveDate>,
    pub invoice_number: Option<String>,
    pub supplier: Option<String>,
    pub responsible: Option<String>,
    pub observations: Option<String>,
}

impl Registry {
    pub async fn load_assets(&self, assets: Vec<Asset>) {
        *self.assets.write().await = assets;
    }

    /// Search matches name or patrimony id
    pub async fn list_assets(&self, search: Option<&str>, unit_id: Option<&str>) -> Vec<Asset> {
        let search = Search::new(search);
        self.assets
            .read()
            .await
            .iter()
            .filter(|a| unit_id.map_or(true, |id| a.unit_id == id))
            .filter(|a| search.matches([a.name.as_str(), a.patrimony_id.as_str()]))
            .cloned()
            .collect()
    }

    pub async fn get_asset(&self, id: &str) -> ApiResult<Asset> {
        self.assets
            .read()
            .await
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| AppError::not_found("Asset"))
    }

    /// Validate against the current units and sectors. `existing` is the id
    /// being replaced, excluded from the patrimony uniqueness check.
    async fn build_asset(&self, id: String, input: AssetInput, existing: Option<&str>) -> ApiResult<Asset> {
        let mut errors = ValidationBuilder::new();
        let name = string::required(input.name.as_deref(), "name", "Asset name is required", &mut errors);
        let patrimony_id = string::required(
            input.patrimony_id.as_deref(),
            "patrimony_id",
            "Patrimony number is required",
            &mut errors,
        );
        let category = string::required(input.category.as_deref(), "category", "Category is required", &mut errors);
        let unit_id = string::required(input.unit_id.as_deref(), "unit_id", "Select a unit", &mut errors);
        let sector_id = string::optional(input.sector_id);

        if let Some(value) = input.value {
            if value.is_sign_negative() {
                errors.push("value", "Value cannot be negative");
            }
        }

        let units = self.units.read().await;
        let sectors = self.sectors.read().await;
        let assets = self.assets.read().await;

        if let Some(unit_id) = &unit_id {
            if !units.iter().any(|u| &u.id == unit_id) {
                errors.push("unit_id", "Unit does not exist");
            }
            if let Some(sector_id) = &sector_id {
                match sectors.iter().find(|s| &s.id == sector_id) {
                    Some(sector) if &sector.unit_id == unit_id => {}
                    Some(_) => errors.push("sector_id", "Sector belongs to a different unit"),
                    None => errors.push("sector_id", "Sector does not exist"),
                }
            }
        }

        if let Some(patrimony_id) = &patrimony_id {
            let taken = assets.iter().any(|a| {
                Some(a.id.as_str()) != existing && a.patrimony_id.eq_ignore_ascii_case(patrimony_id)
            });
            if taken {
                return Err(AppError::conflict(format!(
                    "Patrimony number {} is already registered",
                    patrimony_id
                )));
            }
        }
        errors.finish()?;

        Ok(Asset {
            id,
            name: name.unwrap_or_default(),
            patrimony_id: patrimony_id.unwrap_or_default(),
            category: category.unwrap_or_default(),
            status: input.status.unwrap_or_default(),
            unit_id: unit_id.unwrap_or_default(),
            sector_id,
            description: input.description.unwrap_or_default().trim().to_string(),
            brand: string::optional(input.brand),
            model: string::optional(input.model),
            serial_number: string::optional(input.serial_number),
            acquisition_date: input.acquisition_date,
            value: input.value,
            warranty_date: input.warranty_date,
            invoice_number: string::optional(input.invoice_number),
            supplier: string::optional(input.supplier),
            responsible: string::optional(input.responsible),
            observations: string::optional(input.observations),
        })
    }

    pub async fn create_asset(&self, input: AssetInput) -> ApiResult<Asset> {
        let asset = self.build_asset(new_id(), input, None).await?;
        self.assets.write().await.push(asset.clone());
        tracing::info!(asset_id = %asset.id, patrimony_id = %asset.patrimony_id, "asset registered");
        Ok(asset)
    }

    pub async fn update_asset(&self, id: &str, input: AssetInput) -> ApiResult<Asset> {
        self.get_asset(id).await?;
        let updated = self.build_asset(id.to_string(), input, Some(id)).await?;
        let mut assets = self.assets.write().await;
        let asset = assets
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| AppError::not_found("Asset"))?;
        *asset = updated.clone();
        Ok(updated)
    }

    pub async fn delete_asset(&self, id: &str) -> ApiResult<()> {
        let mut assets = self.assets.write().await;
        let before = assets.len();
        assets.retain(|a| a.id != id);
        if assets.len() == before {
            return Err(AppError::not_found("Asset"));
        }
        Ok(())
    }
}
