//! Inventory REST API client.

use std::sync::Arc;

use chrono::NaiveDate;
use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, de::DeserializeOwned};
use tarimas_core::{
    AssignmentTarget, EvolutionBucket, Granularity, InventoryLine, OrderId, PalletCode,
    ReleasePatch,
};
use tracing::{debug, info, instrument};
use url::Url;

use super::cache::{CacheKey, CacheValue};
use crate::config::InventoryConfig;
use crate::error::SourceError;
use crate::events::Origin;
use crate::source::{AssignmentBackend, InventorySource};

/// Bulk read of every inventory line.
const INVENTORY_PATH: &str = "inventario/resumen";

/// Release endpoint; takes a list of `{pedido_id, codigo}` pairs.
const RELEASE_PATH: &str = "pedidos-cliente/tarimas/liberar";

/// Longest error body kept in [`SourceError::Status`].
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Maximum number of cached reads.
const CACHE_CAPACITY: u64 = 64;

/// Client for the inventory backend.
///
/// Cheap to clone; clones share the HTTP connection pool and the read cache.
#[derive(Clone)]
pub struct InventoryApiClient {
    inner: Arc<InventoryApiClientInner>,
}

struct InventoryApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for InventoryApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("cached_entries", &self.inner.cache.entry_count())
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct AssignRequest<'a> {
    codigos: &'a [PalletCode],
}

impl InventoryApiClient {
    /// Create a new client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::Http` if the HTTP client cannot be created.
    pub fn new(config: &InventoryConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(InventoryApiClientInner {
                client,
                base_url: config.api_url.clone(),
                token: config.api_token.clone(),
                cache,
            }),
        })
    }

    /// Base URL every endpoint is resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    // =========================================================================
    // Request Helpers
    // =========================================================================

    fn endpoint(&self, path: &str) -> Result<Url, SourceError> {
        Ok(self.inner.base_url.join(path)?)
    }

    fn evolution_url(
        &self,
        granularity: Granularity,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Url, SourceError> {
        let mut url = self.endpoint(&format!("inventario/evolucion/{}", granularity.as_str()))?;
        url.query_pairs_mut()
            .append_pair("fecha_inicio", &start.to_string())
            .append_pair("fecha_fin", &end.to_string());
        Ok(url)
    }

    /// Send `request` and fail on any non-success status.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, SourceError> {
        let request = match &self.inner.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(SourceError::Status {
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        })
    }

    /// Send `request` and decode the JSON body.
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, SourceError> {
        let bytes = self.send(request).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Invalidate all cached reads.
    ///
    /// Entries stop being visible immediately; moka evicts them lazily.
    pub fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
    }
}

impl InventorySource for InventoryApiClient {
    #[instrument(skip(self))]
    async fn fetch_inventory_lines(&self) -> Result<Vec<InventoryLine>, SourceError> {
        if let Some(CacheValue::InventoryLines(lines)) =
            self.inner.cache.get(&CacheKey::InventoryLines).await
        {
            debug!("Cache hit for inventory lines");
            return Ok(Vec::clone(&lines));
        }

        let url = self.endpoint(INVENTORY_PATH)?;
        let lines: Vec<InventoryLine> = self.send_json(self.inner.client.get(url)).await?;
        debug!(lines = lines.len(), "Fetched inventory lines");

        self.inner
            .cache
            .insert(
                CacheKey::InventoryLines,
                CacheValue::InventoryLines(Arc::new(lines.clone())),
            )
            .await;
        Ok(lines)
    }

    #[instrument(skip(self, granularity), fields(granularity = %granularity))]
    async fn fetch_evolution(
        &self,
        granularity: Granularity,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<EvolutionBucket>, SourceError> {
        let key = CacheKey::Evolution {
            granularity,
            start,
            end,
        };
        if let Some(CacheValue::Evolution(buckets)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for evolution series");
            return Ok(Vec::clone(&buckets));
        }

        let url = self.evolution_url(granularity, start, end)?;
        let buckets: Vec<EvolutionBucket> = self.send_json(self.inner.client.get(url)).await?;

        self.inner
            .cache
            .insert(key, CacheValue::Evolution(Arc::new(buckets.clone())))
            .await;
        Ok(buckets)
    }

    fn invalidate_cache(&self, origin: &Origin) {
        info!(origin = %origin, "Invalidating inventory cache");
        self.invalidate_all();
    }
}

impl AssignmentBackend for InventoryApiClient {
    #[instrument(skip(self, order_id, pallet_codes), fields(order_id = %order_id, pallets = pallet_codes.len()))]
    async fn assign_pallets(
        &self,
        order_id: OrderId,
        pallet_codes: &[PalletCode],
    ) -> Result<AssignmentTarget, SourceError> {
        let url = self.endpoint(&format!("pedidos-cliente/{order_id}/tarimas"))?;
        let request = self.inner.client.post(url).json(&AssignRequest {
            codigos: pallet_codes,
        });
        let target: AssignmentTarget = self.send_json(request).await?;

        self.invalidate_all();
        info!(client = %target.client, "Pallets assigned");
        Ok(target)
    }

    #[instrument(skip(self, patches), fields(pallets = patches.len()))]
    async fn unassign_pallets(&self, patches: &[ReleasePatch]) -> Result<(), SourceError> {
        let url = self.endpoint(RELEASE_PATH)?;
        self.send(self.inner.client.post(url).json(patches)).await?;

        self.invalidate_all();
        info!("Pallets released");
        Ok(())
    }
}
