//! Public product catalog.
//!
//! The approved listing is fetched once and cached (`moka`, TTL from
//! `CATALOG_CACHE_TTL_SECS`); search and category narrowing happen in memory.
//! Any product moderation change invalidates the cached listing.

use std::sync::Arc;
use std::time::Duration;

use herhouse_core::{Product, ProductId, ProductStatus, Profile};
use moka::future::Cache;
use tracing::{debug, instrument};

use crate::backend::{BackendClient, BackendError, TableQuery};

const PRODUCTS: &str = "products";
const PROFILES: &str = "profiles";

/// Cache keys. The catalog holds a single listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CatalogKey {
    Approved,
}

/// An approved product with the host selling it.
#[derive(Debug, Clone)]
pub struct ProductDetail {
    pub product: Product,
    /// `None` when the host profile is not visible to the viewer.
    pub host: Option<Profile>,
}

/// Read access to approved products.
#[derive(Clone)]
pub struct CatalogService {
    backend: BackendClient,
    listing: Cache<CatalogKey, Arc<Vec<Product>>>,
}

impl CatalogService {
    /// Create a catalog whose listing lives for `ttl`.
    #[must_use]
    pub fn new(backend: BackendClient, ttl: Duration) -> Self {
        let listing = Cache::builder().max_capacity(1).time_to_live(ttl).build();
        Self { backend, listing }
    }

    /// Approved products, featured first, then newest.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing is not cached and cannot be fetched.
    #[instrument(skip(self))]
    pub async fn approved_products(&self) -> Result<Arc<Vec<Product>>, BackendError> {
        if let Some(products) = self.listing.get(&CatalogKey::Approved).await {
            debug!("Cache hit for approved products");
            return Ok(products);
        }

        let query = TableQuery::new(PRODUCTS)
            .eq("status", ProductStatus::Approved.as_str())
            .order_desc("is_featured")
            .newest_first();
        let products: Arc<Vec<Product>> = Arc::new(self.backend.select(&query, None).await?);

        self.listing
            .insert(CatalogKey::Approved, Arc::clone(&products))
            .await;

        Ok(products)
    }

    /// Drop the cached listing so the next read refetches it.
    pub async fn invalidate(&self) {
        self.listing.invalidate(&CatalogKey::Approved).await;
    }

    /// One approved product and its host.
    ///
    /// `token` lets a signed-in viewer see host details their row-level
    /// access allows; a failed host lookup only hides the seller block.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] if no approved product has `id`.
    #[instrument(skip(self, token), fields(product_id = %id))]
    pub async fn product_detail(
        &self,
        id: ProductId,
        token: Option<&str>,
    ) -> Result<ProductDetail, BackendError> {
        let product: Product = self
            .backend
            .select_single(
                &TableQuery::new(PRODUCTS)
                    .eq("id", id)
                    .eq("status", ProductStatus::Approved.as_str()),
                token,
            )
            .await?;

        let host = match self
            .backend
            .select_single::<Profile>(
                &TableQuery::new(PROFILES).eq("id", product.her_host_id),
                token,
            )
            .await
        {
            Ok(host) => Some(host),
            Err(e) => {
                debug!(error = %e, "Host profile not available");
                None
            }
        };

        Ok(ProductDetail { product, host })
    }
}
