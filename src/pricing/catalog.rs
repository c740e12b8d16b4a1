//! Pricing catalog: plans and services.
//!
//! Quote operations only read the catalog, through `PricingCatalog`.
//! `CatalogAdmin` is the write side used by the admin endpoints; every write
//! drops the cached listing it affects.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::cache::{AppCache, CATALOG_KEY};
use crate::error::{AppError, Result};

use super::models::{PricingPlan, Service};
use super::queries;
use super::requests::{
    CreatePlanRequest, CreateServiceRequest, UpdatePlanRequest, UpdateServiceRequest,
};
use super::validation;

/// Storage behind the catalog.
///
/// Listings return every row, active or not: plans active first then by
/// name, services by display order then name.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn find_plan(&self, id: Uuid) -> Result<Option<PricingPlan>>;
    async fn find_service(&self, id: Uuid) -> Result<Option<Service>>;
    async fn list_plans(&self) -> Result<Vec<PricingPlan>>;
    async fn list_services(&self) -> Result<Vec<Service>>;

    async fn insert_plan(&self, plan: &PricingPlan) -> Result<()>;
    /// Returns false when no plan has this id.
    async fn save_plan(&self, plan: &PricingPlan) -> Result<bool>;
    async fn insert_service(&self, service: &Service) -> Result<()>;
    /// Returns false when no service has this id.
    async fn save_service(&self, service: &Service) -> Result<bool>;
}

/// Read side of the catalog
#[derive(Clone)]
pub struct PricingCatalog {
    repo: Arc<dyn CatalogRepository>,
    cache: AppCache,
}

impl PricingCatalog {
    pub fn new(repo: Arc<dyn CatalogRepository>, cache: AppCache) -> Self {
        Self { repo, cache }
    }

    pub fn cache(&self) -> &AppCache {
        &self.cache
    }

    /// Look up a plan, hiding inactive ones.
    pub async fn find_active_plan(&self, id: Uuid) -> Result<Option<PricingPlan>> {
        Ok(self.repo.find_plan(id).await?.filter(|p| p.is_active))
    }

    /// Resolve a plan chosen for a quote. Missing and inactive plans are both
    /// rejected.
    pub async fn require_active_plan(&self, id: Uuid) -> Result<PricingPlan> {
        self.find_active_plan(id)
            .await?
            .ok_or_else(|| AppError::InvalidPricingPlan(format!("{} is missing or inactive", id)))
    }

    /// Look up a service, including inactive ones.
    pub async fn find_service(&self, id: Uuid) -> Result<Option<Service>> {
        self.repo.find_service(id).await
    }

    /// Resolve a service for a new line item.
    pub async fn require_active_service(&self, id: Uuid) -> Result<Service> {
        match self.find_service(id).await? {
            Some(service) if service.is_active => Ok(service),
            Some(_) => Err(AppError::InvalidService(format!("{} is inactive", id))),
            None => Err(AppError::InvalidService(format!("{} does not exist", id))),
        }
    }

    /// Every plan, cached.
    pub async fn all_plans(&self) -> Result<Arc<Vec<PricingPlan>>> {
        if let Some(plans) = self.cache.plans.get(CATALOG_KEY).await {
            debug!("Pricing plan cache hit");
            return Ok(plans);
        }

        debug!("Pricing plan cache miss");
        let plans = Arc::new(self.repo.list_plans().await?);
        self.cache
            .plans
            .insert(CATALOG_KEY.to_string(), plans.clone())
            .await;
        Ok(plans)
    }

    /// Every service, cached.
    pub async fn all_services(&self) -> Result<Arc<Vec<Service>>> {
        if let Some(services) = self.cache.services.get(CATALOG_KEY).await {
            debug!("Service cache hit");
            return Ok(services);
        }

        debug!("Service cache miss");
        let services = Arc::new(self.repo.list_services().await?);
        self.cache
            .services
            .insert(CATALOG_KEY.to_string(), services.clone())
            .await;
        Ok(services)
    }

    pub async fn list_active_plans(&self) -> Result<Vec<PricingPlan>> {
        let plans = self.all_plans().await?;
        Ok(plans.iter().filter(|p| p.is_active).cloned().collect())
    }

    pub async fn list_active_services(&self) -> Result<Vec<Service>> {
        let services = self.all_services().await?;
        Ok(services.iter().filter(|s| s.is_active).cloned().collect())
    }
}

/// Write side of the catalog
#[derive(Clone)]
pub struct CatalogAdmin {
    repo: Arc<dyn CatalogRepository>,
    cache: AppCache,
}

impl CatalogAdmin {
    pub fn new(repo: Arc<dyn CatalogRepository>, cache: AppCache) -> Self {
        Self { repo, cache }
    }

    pub async fn create_plan(
        &self,
        mut req: CreatePlanRequest,
        default_currency: &str,
    ) -> Result<PricingPlan> {
        req.name = req.name.trim().to_string();
        req.validate()?;

        let rate = validation::rate_per_area(
            req.rate_per_area
                .ok_or_else(|| AppError::validation("ratePerArea", "is required"))?,
        )?;
        let currency = match req.currency.as_deref() {
            Some(c) => validation::currency(c)?,
            None => default_currency.to_string(),
        };
        validation::day_range(req.min_days, req.max_days)?;

        let plan = PricingPlan {
            id: Uuid::new_v4(),
            name: req.name,
            rate_per_area: rate,
            currency,
            min_days: req.min_days,
            max_days: req.max_days,
            is_active: req.is_active,
            created_at: Utc::now(),
        };
        self.repo.insert_plan(&plan).await?;
        self.cache.invalidate_plans().await;

        info!(plan_id = %plan.id, name = %plan.name, "Pricing plan created");
        Ok(plan)
    }

    pub async fn update_plan(&self, id: Uuid, mut req: UpdatePlanRequest) -> Result<PricingPlan> {
        if let Some(name) = req.name.as_mut() {
            *name = name.trim().to_string();
        }
        req.validate()?;

        let mut plan = self
            .repo
            .find_plan(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Pricing plan {}", id)))?;

        if let Some(name) = req.name {
            plan.name = name;
        }
        if let Some(rate) = req.rate_per_area {
            plan.rate_per_area = validation::rate_per_area(rate)?;
        }
        if let Some(currency) = req.currency.as_deref() {
            plan.currency = validation::currency(currency)?;
        }
        if let Some(min_days) = req.min_days {
            plan.min_days = min_days;
        }
        if let Some(max_days) = req.max_days {
            plan.max_days = max_days;
        }
        if let Some(active) = req.is_active {
            plan.is_active = active;
        }
        validation::day_range(plan.min_days, plan.max_days)?;

        self.save_plan(&plan).await?;
        info!(plan_id = %plan.id, "Pricing plan updated");
        Ok(plan)
    }

    /// Soft delete: the plan stays readable by quotes that captured it.
    pub async fn deactivate_plan(&self, id: Uuid) -> Result<()> {
        let mut plan = self
            .repo
            .find_plan(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Pricing plan {}", id)))?;
        plan.is_active = false;

        self.save_plan(&plan).await?;
        info!(plan_id = %id, "Pricing plan deactivated");
        Ok(())
    }

    async fn save_plan(&self, plan: &PricingPlan) -> Result<()> {
        if !self.repo.save_plan(plan).await? {
            return Err(AppError::NotFound(format!("Pricing plan {}", plan.id)));
        }
        self.cache.invalidate_plans().await;
        Ok(())
    }

    pub async fn create_service(
        &self,
        mut req: CreateServiceRequest,
        default_currency: &str,
    ) -> Result<Service> {
        req.name = req.name.trim().to_string();
        req.validate()?;

        let price = validation::unit_price("price", req.price.unwrap_or(Decimal::ZERO))?;
        let currency = match req.currency.as_deref() {
            Some(c) => validation::currency(c)?,
            None => default_currency.to_string(),
        };

        let service = Service {
            id: Uuid::new_v4(),
            name: req.name,
            description: validation::optional_text(req.description),
            pricing_mode: req.pricing_mode,
            price,
            currency,
            is_addon: req.is_addon,
            is_active: req.is_active,
            display_order: req.display_order,
        };
        self.repo.insert_service(&service).await?;
        self.cache.invalidate_services().await;

        info!(service_id = %service.id, name = %service.name, "Service created");
        Ok(service)
    }

    pub async fn update_service(&self, id: Uuid, mut req: UpdateServiceRequest) -> Result<Service> {
        if let Some(name) = req.name.as_mut() {
            *name = name.trim().to_string();
        }
        req.validate()?;

        let mut service = self
            .repo
            .find_service(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Service {}", id)))?;

        if let Some(name) = req.name {
            service.name = name;
        }
        if let Some(description) = req.description {
            service.description = validation::optional_text(description);
        }
        if let Some(mode) = req.pricing_mode {
            service.pricing_mode = mode;
        }
        if let Some(price) = req.price {
            service.price = validation::unit_price("price", price)?;
        }
        if let Some(currency) = req.currency.as_deref() {
            service.currency = validation::currency(currency)?;
        }
        if let Some(is_addon) = req.is_addon {
            service.is_addon = is_addon;
        }
        if let Some(active) = req.is_active {
            service.is_active = active;
        }
        if let Some(order) = req.display_order {
            service.display_order = order;
        }

        self.save_service(&service).await?;
        info!(service_id = %service.id, "Service updated");
        Ok(service)
    }

    /// Soft delete: existing line items keep their copied name and mode.
    pub async fn deactivate_service(&self, id: Uuid) -> Result<()> {
        let mut service = self
            .repo
            .find_service(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Service {}", id)))?;
        service.is_active = false;

        self.save_service(&service).await?;
        info!(service_id = %id, "Service deactivated");
        Ok(())
    }

    async fn save_service(&self, service: &Service) -> Result<()> {
        if !self.repo.save_service(service).await? {
            return Err(AppError::NotFound(format!("Service {}", service.id)));
        }
        self.cache.invalidate_services().await;
        Ok(())
    }
}

fn sort_plans(plans: &mut [PricingPlan]) {
    plans.sort_by(|a, b| b.is_active.cmp(&a.is_active).then_with(|| a.name.cmp(&b.name)));
}

fn sort_services(services: &mut [Service]) {
    services.sort_by(|a, b| {
        a.display_order
            .cmp(&b.display_order)
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// Catalog held in process memory
#[derive(Default)]
pub struct MemoryCatalog {
    plans: RwLock<HashMap<Uuid, PricingPlan>>,
    services: RwLock<HashMap<Uuid, Service>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(plans: Vec<PricingPlan>, services: Vec<Service>) -> Self {
        Self {
            plans: RwLock::new(plans.into_iter().map(|p| (p.id, p)).collect()),
            services: RwLock::new(services.into_iter().map(|s| (s.id, s)).collect()),
        }
    }
}

#[async_trait]
impl CatalogRepository for MemoryCatalog {
    async fn find_plan(&self, id: Uuid) -> Result<Option<PricingPlan>> {
        Ok(self.plans.read().await.get(&id).cloned())
    }

    async fn find_service(&self, id: Uuid) -> Result<Option<Service>> {
        Ok(self.services.read().await.get(&id).cloned())
    }

    async fn list_plans(&self) -> Result<Vec<PricingPlan>> {
        let mut plans: Vec<_> = self.plans.read().await.values().cloned().collect();
        sort_plans(&mut plans);
        Ok(plans)
    }

    async fn list_services(&self) -> Result<Vec<Service>> {
        let mut services: Vec<_> = self.services.read().await.values().cloned().collect();
        sort_services(&mut services);
        Ok(services)
    }

    async fn insert_plan(&self, plan: &PricingPlan) -> Result<()> {
        self.plans.write().await.insert(plan.id, plan.clone());
        Ok(())
    }

    async fn save_plan(&self, plan: &PricingPlan) -> Result<bool> {
        let mut plans = self.plans.write().await;
        match plans.get_mut(&plan.id) {
            Some(existing) => {
                *existing = plan.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_service(&self, service: &Service) -> Result<()> {
        self.services.write().await.insert(service.id, service.clone());
        Ok(())
    }

    async fn save_service(&self, service: &Service) -> Result<bool> {
        let mut services = self.services.write().await;
        match services.get_mut(&service.id) {
            Some(existing) => {
                *existing = service.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Catalog stored in Postgres
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for PgCatalog {
    async fn find_plan(&self, id: Uuid) -> Result<Option<PricingPlan>> {
        queries::get_plan(&self.pool, id).await
    }

    async fn find_service(&self, id: Uuid) -> Result<Option<Service>> {
        queries::get_service(&self.pool, id).await
    }

    async fn list_plans(&self) -> Result<Vec<PricingPlan>> {
        queries::list_plans(&self.pool).await
    }

    async fn list_services(&self) -> Result<Vec<Service>> {
        queries::list_services(&self.pool).await
    }

    async fn insert_plan(&self, plan: &PricingPlan) -> Result<()> {
        queries::insert_plan(&self.pool, plan).await
    }

    async fn save_plan(&self, plan: &PricingPlan) -> Result<bool> {
        queries::update_plan(&self.pool, plan).await
    }

    async fn insert_service(&self, service: &Service) -> Result<()> {
        queries::insert_service(&self.pool, service).await
    }

    async fn save_service(&self, service: &Service) -> Result<bool> {
        queries::update_service(&self.pool, service).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pricing::models::PricingMode;
    use rust_decimal_macros::dec;

    pub(crate) fn plan(name: &str, rate: Decimal, active: bool) -> PricingPlan {
        PricingPlan {
            id: Uuid::new_v4(),
            name: name.to_string(),
            rate_per_area: rate,
            currency: "PEN".to_string(),
            min_days: Some(20),
            max_days: Some(30),
            is_active: active,
            created_at: Utc::now(),
        }
    }

    pub(crate) fn service(name: &str, mode: PricingMode, price: Decimal, active: bool) -> Service {
        Service {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            pricing_mode: mode,
            price,
            currency: "PEN".to_string(),
            is_addon: true,
            is_active: active,
            display_order: 0,
        }
    }

    fn catalog_with(
        plans: Vec<PricingPlan>,
        services: Vec<Service>,
    ) -> (PricingCatalog, CatalogAdmin) {
        let repo: Arc<dyn CatalogRepository> =
            Arc::new(MemoryCatalog::with_entries(plans, services));
        let cache = AppCache::default();
        (
            PricingCatalog::new(repo.clone(), cache.clone()),
            CatalogAdmin::new(repo, cache),
        )
    }

    #[tokio::test]
    async fn test_inactive_plan_is_invalid() {
        let retired = plan("Retired", dec!(400), false);
        let (catalog, _) = catalog_with(vec![retired.clone()], vec![]);

        assert!(catalog.find_active_plan(retired.id).await.unwrap().is_none());
        let err = catalog.require_active_plan(retired.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidPricingPlan(_)));
        let err = catalog.require_active_plan(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidPricingPlan(_)));
    }

    #[tokio::test]
    async fn test_find_service_returns_inactive() {
        let old = service("Old", PricingMode::Flat, dec!(100), false);
        let (catalog, _) = catalog_with(vec![], vec![old.clone()]);

        assert_eq!(catalog.find_service(old.id).await.unwrap(), Some(old.clone()));
        let err = catalog.require_active_service(old.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidService(_)));
    }

    #[tokio::test]
    async fn test_active_listings_filter_and_order() {
        let (catalog, _) = catalog_with(
            vec![
                plan("Standard", dec!(500), true),
                plan("Economy", dec!(300), true),
                plan("Legacy", dec!(200), false),
            ],
            vec![service("Planos", PricingMode::Flat, dec!(1500), true)],
        );

        let names: Vec<_> = catalog
            .list_active_plans()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Economy", "Standard"]);

        let all = catalog.all_plans().await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].name, "Legacy");
    }

    #[tokio::test]
    async fn test_admin_write_invalidates_listing() {
        let (catalog, admin) = catalog_with(vec![], vec![]);
        assert!(catalog.list_active_services().await.unwrap().is_empty());

        let req = CreateServiceRequest {
            name: "  Supervision ".to_string(),
            pricing_mode: PricingMode::Percentage,
            price: Some(dec!(10)),
            currency: Some("pen".to_string()),
            is_active: true,
            ..Default::default()
        };
        let created = admin.create_service(req, "PEN").await.unwrap();
        assert_eq!(created.name, "Supervision");
        assert_eq!(created.currency, "PEN");

        let listed = catalog.list_active_services().await.unwrap();
        assert_eq!(listed.len(), 1);

        admin.deactivate_service(created.id).await.unwrap();
        assert!(catalog.list_active_services().await.unwrap().is_empty());
        // still resolvable for existing line items
        assert!(catalog.find_service(created.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_admin_rejects_bad_plan() {
        let (_, admin) = catalog_with(vec![], vec![]);

        let req = CreatePlanRequest {
            name: "Zero".to_string(),
            rate_per_area: Some(dec!(0)),
            is_active: true,
            ..Default::default()
        };
        assert!(matches!(
            admin.create_plan(req, "PEN").await,
            Err(AppError::Validation { .. })
        ));

        let req = CreatePlanRequest {
            name: "Backwards".to_string(),
            rate_per_area: Some(dec!(400)),
            min_days: Some(40),
            max_days: Some(10),
            is_active: true,
            ..Default::default()
        };
        assert!(matches!(
            admin.create_plan(req, "PEN").await,
            Err(AppError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_admin_rejects_prices_beyond_storage() {
        let (_, admin) = catalog_with(vec![], vec![]);

        let req = CreatePlanRequest {
            name: "Luxury".to_string(),
            rate_per_area: Some(dec!(1000000000000)),
            is_active: true,
            ..Default::default()
        };
        let err = admin.create_plan(req, "PEN").await.unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "ratePerArea"));

        let req = CreateServiceRequest {
            name: "Tower".to_string(),
            pricing_mode: PricingMode::Flat,
            price: Some(dec!(1000000000000)),
            is_active: true,
            ..Default::default()
        };
        let err = admin.create_service(req, "PEN").await.unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "price"));
    }

    #[tokio::test]
    async fn test_update_missing_plan_is_not_found() {
        let (_, admin) = catalog_with(vec![], vec![]);
        let err = admin
            .update_plan(Uuid::new_v4(), UpdatePlanRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
