use crate::auth::AuthContext;
use crate::domains::car_listing::repository::CarListingRepository;
use crate::domains::car_listing::types::{
    CarListingQuery, CarListingResponse, NewCarListing, UpdateCarListing,
};
use crate::domains::history::types::{EntityType, HistoryAction, NewHistoryEntry};
use crate::domains::history::{diff, HistoryService};
use crate::errors::ServiceResult;
use crate::types::{PaginatedResult, PaginationParams, Permission, RequestMeta};
use crate::validation::{ensure_ordered, Validate, ValidationBuilder};
use std::sync::Arc;

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

pub struct CarListingService {
    repo: Arc<dyn CarListingRepository>,
    history: Arc<HistoryService>,
}

impl CarListingService {
    pub fn new(repo: Arc<dyn CarListingRepository>, history: Arc<HistoryService>) -> Self {
        Self { repo, history }
    }

    /// Public, paginated listing with photos attached
    pub async fn list(&self, query: CarListingQuery) -> ServiceResult<PaginatedResult<CarListingResponse>> {
        let limit = query.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_PAGE_SIZE);
        ValidationBuilder::new("limit", Some(limit))
            .range(1, MAX_PAGE_SIZE)
            .validate()?;
        ValidationBuilder::new("min_price", query.min_price).finite().min(0.0).validate()?;
        ValidationBuilder::new("max_price", query.max_price).finite().min(0.0).validate()?;
        ValidationBuilder::new("max_kilometers", query.max_kilometers).min(0).validate()?;
        ensure_ordered(query.min_price.as_ref(), query.max_price.as_ref(), "min_price", "max_price")?;

        let page = query.page.filter(|p| *p > 0).unwrap_or(1);
        let params = PaginationParams::resolve(limit, None, Some(page));

        let (listings, total) = self.repo.find_all(&query, params).await?;
        let ids: Vec<i64> = listings.iter().map(|l| l.id).collect();
        let mut photos = self.repo.find_photo_urls(&ids).await?;

        let data = listings
            .into_iter()
            .map(|listing| {
                let images = photos.remove(&listing.id).unwrap_or_default();
                CarListingResponse::new(listing, images)
            })
            .collect();

        Ok(PaginatedResult::with_page(data, total, params, page))
    }

    pub async fn get(&self, id: i64) -> ServiceResult<CarListingResponse> {
        let listing = self.repo.find_by_id(id).await?;
        let images = self
            .repo
            .find_photos(id)
            .await?
            .into_iter()
            .map(|p| p.photo_url)
            .collect();
        Ok(CarListingResponse::new(listing, images))
    }

    pub async fn create(
        &self,
        listing: NewCarListing,
        auth: &AuthContext,
        meta: &RequestMeta,
    ) -> ServiceResult<CarListingResponse> {
        auth.authorize(Permission::ManageListings)?;
        listing.validate()?;

        let created = self.repo.create(listing).await?;
        self.log_change(
            NewHistoryEntry {
                entity_type: EntityType::Car,
                entity_id: created.id,
                action: HistoryAction::Create,
                changes: None,
                description: Some(format!("Создано объявление: {}", created.title)),
            },
            auth,
            meta,
        )
        .await;

        self.get(created.id).await
    }

    pub async fn update(
        &self,
        id: i64,
        update: UpdateCarListing,
        auth: &AuthContext,
        meta: &RequestMeta,
    ) -> ServiceResult<CarListingResponse> {
        auth.authorize(Permission::ManageListings)?;
        update.validate()?;

        let before = self.repo.find_by_id(id).await?;
        let updated = self.repo.update(id, update).await?;

        self.log_change(
            NewHistoryEntry {
                entity_type: EntityType::Car,
                entity_id: id,
                action: HistoryAction::Update,
                changes: diff(&before, &updated),
                description: Some(format!("Обновлено объявление: {}", updated.title)),
            },
            auth,
            meta,
        )
        .await;

        self.get(id).await
    }

    pub async fn delete(&self, id: i64, auth: &AuthContext, meta: &RequestMeta) -> ServiceResult<()> {
        auth.authorize(Permission::ManageListings)?;

        let listing = self.repo.find_by_id(id).await?;
        self.repo.delete(id).await?;

        self.log_change(
            NewHistoryEntry {
                entity_type: EntityType::Car,
                entity_id: id,
                action: HistoryAction::Delete,
                changes: None,
                description: Some(format!("Удалено объявление: {}", listing.title)),
            },
            auth,
            meta,
        )
        .await;

        Ok(())
    }

    async fn log_change(&self, entry: NewHistoryEntry, auth: &AuthContext, meta: &RequestMeta) {
        let entity_id = entry.entity_id;
        if let Err(e) = self.history.record(entry, auth, meta).await {
            log::error!("Failed to record history for car listing {}: {}", entity_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::car_listing::repository::SqliteCarListingRepository;
    use crate::domains::history::types::HistoryFilter;
    use crate::domains::history::SqliteHistoryRepository;
    use crate::errors::ServiceError;
    use crate::test_support::migrated_pool;
    use crate::types::UserRole;
    use serde_json::json;

    async fn services() -> (CarListingService, Arc<HistoryService>) {
        let pool = migrated_pool().await;
        let history = Arc::new(HistoryService::new(Arc::new(SqliteHistoryRepository::new(pool.clone()))));
        let service = CarListingService::new(Arc::new(SqliteCarListingRepository::new(pool)), history.clone());
        (service, history)
    }

    fn manager() -> AuthContext {
        AuthContext::new(2, "m@example.com".to_string(), "Maria".to_string(), UserRole::Manager)
    }

    fn camry() -> NewCarListing {
        NewCarListing {
            short_url: "https://cars.example/camry".to_string(),
            title: "Toyota Camry".to_string(),
            make: "Toyota".to_string(),
            model: "Camry".to_string(),
            price_raw: 21000.0,
            photos: vec!["front.jpg".to_string(), "back.jpg".to_string()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_get_attaches_images_and_main_image() {
        let (service, _) = services().await;
        let created = service.create(camry(), &manager(), &RequestMeta::default()).await.unwrap();
        assert_eq!(created.images, vec!["front.jpg".to_string(), "back.jpg".to_string()]);
        assert_eq!(created.main_image.as_deref(), Some("front.jpg"));

        let listed = service.list(CarListingQuery::default()).await.unwrap();
        assert_eq!(listed.pagination.total, 1);
        assert_eq!(listed.pagination.limit, 10);
        assert_eq!(listed.data[0].main_image.as_deref(), Some("front.jpg"));
    }

    #[tokio::test]
    async fn test_plain_user_cannot_create() {
        let (service, _) = services().await;
        let user = AuthContext::new(3, "u@example.com".to_string(), "U".to_string(), UserRole::User);
        assert!(matches!(
            service.create(camry(), &user, &RequestMeta::default()).await,
            Err(ServiceError::PermissionDenied(_))
        ));
    }

    #[tokio::test]
    async fn test_update_logs_price_change() {
        let (service, history) = services().await;
        let auth = manager();
        let created = service.create(camry(), &auth, &RequestMeta::default()).await.unwrap();

        service
            .update(
                created.listing.id,
                UpdateCarListing { price_raw: Some(19500.0), ..Default::default() },
                &auth,
                &RequestMeta::default(),
            )
            .await
            .unwrap();

        let page = history
            .list(HistoryFilter { action: Some(HistoryAction::Update), ..Default::default() }, &auth)
            .await
            .unwrap();
        let changes = page.data[0].changes.clone().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes["price_raw"].new, json!(19500.0));
    }

    #[tokio::test]
    async fn test_inverted_price_range_rejected() {
        let (service, _) = services().await;
        let query = CarListingQuery { min_price: Some(10.0), max_price: Some(5.0), ..Default::default() };
        assert!(service.list(query).await.is_err());

        let query = CarListingQuery { max_price: Some(f64::NAN), ..Default::default() };
        assert!(service.list(query).await.is_err());
    }
}
