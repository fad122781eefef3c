//! AAS repository: CRUD over the asset aggregate
//!
//! Every mutation follows the same path: take the asset's lock, load it,
//! check the caller's expected revision, apply the change, validate, bump
//! `last_modified` and write the aggregate back in one atomic save.

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::context::{Context, check_revision};
use crate::error::{AasError, AasResult};
use crate::events::AasEvent;
use crate::model::{Asset, AssetFilter, AssetPatch, AssetSummary, NewAsset, Property, Submodel};

/// Prefix of generated asset ids
pub const GENERATED_ID_PREFIX: &str = "urn:aas:asset:";

#[derive(Clone)]
pub struct AasRepository {
    ctx: Context,
}

impl AasRepository {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self, spec), fields(name = %spec.name, kind = %spec.kind))]
    pub async fn create_asset(&self, spec: NewAsset) -> AasResult<Asset> {
        let id = match &spec.id {
            Some(id) => id.clone(),
            None => format!("{GENERATED_ID_PREFIX}{}", Uuid::now_v7()),
        };

        let asset = spec.into_asset(id, Utc::now());
        asset.validate()?;

        let _guard = self.ctx.locks.lock(&asset.id).await;
        self.ctx
            .storage("insert_asset", || self.ctx.backend.insert_asset(&asset))
            .await?;

        info!("created asset {} ({})", asset.id, asset.kind);
        self.ctx.events.publish(AasEvent::AssetCreated {
            asset_id: asset.id.clone(),
            last_modified: asset.last_modified,
        });
        Ok(asset)
    }

    pub async fn get_asset(&self, id: &str) -> AasResult<Asset> {
        self.ctx.load_asset(id).await
    }

    /// Summaries ordered by creation time, ties by id
    pub async fn list_assets(&self, filter: &AssetFilter) -> AasResult<Vec<AssetSummary>> {
        let assets = self
            .ctx
            .storage("list_assets", || self.ctx.backend.list_assets(filter))
            .await?;
        Ok(assets.iter().map(Asset::summary).collect())
    }

    /// Create or replace a submodel, keeping its position when replaced
    #[instrument(skip(self, submodel), fields(submodel_id = %submodel.id))]
    pub async fn upsert_submodel(
        &self,
        asset_id: &str,
        submodel: Submodel,
        expected: Option<u64>,
    ) -> AasResult<Asset> {
        submodel.validate()?;
        self.mutate(asset_id, expected, |asset, _| {
            asset.upsert_submodel(submodel);
            Ok(())
        })
        .await
    }

    #[instrument(skip(self, property), fields(key = %property.key))]
    pub async fn upsert_property(
        &self,
        asset_id: &str,
        submodel_id: &str,
        mut property: Property,
        expected: Option<u64>,
    ) -> AasResult<Asset> {
        property.validate()?;
        self.mutate(asset_id, expected, |asset, now| {
            let submodel = asset.submodel_mut(submodel_id).ok_or_else(|| {
                AasError::not_found(format!("submodel {submodel_id} of asset {asset_id}"))
            })?;
            property.updated_at = now;
            submodel.upsert_property(property);
            Ok(())
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn delete_submodel(
        &self,
        asset_id: &str,
        submodel_id: &str,
        expected: Option<u64>,
    ) -> AasResult<Asset> {
        self.mutate(asset_id, expected, |asset, _| {
            if asset.remove_submodel(submodel_id) {
                Ok(())
            } else {
                Err(AasError::not_found(format!(
                    "submodel {submodel_id} of asset {asset_id}"
                )))
            }
        })
        .await
    }

    /// Change name, description, status or maintenance schedule
    #[instrument(skip(self, patch))]
    pub async fn update_asset(
        &self,
        asset_id: &str,
        patch: AssetPatch,
        expected: Option<u64>,
    ) -> AasResult<Asset> {
        if patch.is_empty() {
            return Err(AasError::validation("asset update contains no changes"));
        }
        self.mutate(asset_id, expected, |asset, _| {
            patch.apply(asset);
            Ok(())
        })
        .await
    }

    /// Delete an asset and everything it owns; `false` if it was already gone
    #[instrument(skip(self))]
    pub async fn delete_asset(&self, id: &str) -> AasResult<bool> {
        let _guard = self.ctx.locks.lock(id).await;
        let deleted = self
            .ctx
            .storage("delete_asset", || self.ctx.backend.delete_asset(id))
            .await?;

        if deleted {
            info!("deleted asset {id}");
            self.ctx.events.publish(AasEvent::AssetDeleted {
                asset_id: id.to_string(),
            });
        } else {
            debug!("asset {id} already absent");
        }
        Ok(deleted)
    }

    async fn mutate<F>(&self, asset_id: &str, expected: Option<u64>, apply: F) -> AasResult<Asset>
    where
        F: FnOnce(&mut Asset, DateTime<Utc>) -> AasResult<()>,
    {
        let _guard = self.ctx.locks.lock(asset_id).await;

        let mut asset = self.ctx.load_asset(asset_id).await?;
        check_revision(&asset, expected)?;

        let now = Utc::now();
        apply(&mut asset, now)?;
        asset.validate()?;
        asset.touch(now);

        self.ctx
            .storage("save_asset", || self.ctx.backend.save_asset(&asset, &[]))
            .await?;

        self.ctx.events.publish(AasEvent::AssetUpdated {
            asset_id: asset.id.clone(),
            last_modified: asset.last_modified,
        });
        Ok(asset)
    }
}
