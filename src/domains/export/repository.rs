use crate::domains::car_listing::types::{CarListing, CarListingRow};
use crate::domains::export::filter::Predicate;
use crate::domains::export::types::ExportKind;
use crate::domains::user::types::{User, UserRow};
use crate::errors::{DbError, DomainResult};
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashMap;

/// SQLite caps bound parameters per statement; photo lookups are split below it
const PHOTO_LOOKUP_CHUNK: usize = 10_000;

/// Read side of the export pipeline
#[async_trait]
pub trait ExportRepository: Send + Sync {
    /// Number of rows of `kind` matching `predicate`
    async fn count(&self, kind: ExportKind, predicate: &Predicate) -> DomainResult<u64>;

    /// Matching listings ordered by id
    async fn fetch_cars(&self, predicate: &Predicate) -> DomainResult<Vec<CarListing>>;

    /// Matching users ordered by id
    async fn fetch_users(&self, predicate: &Predicate) -> DomainResult<Vec<User>>;

    /// First photo (lowest photo id) per listing; listings without photos are absent
    async fn first_photos(&self, listing_ids: &[i64]) -> DomainResult<HashMap<i64, String>>;
}

pub struct SqliteExportRepository {
    pool: SqlitePool,
}

impl SqliteExportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn table(kind: ExportKind) -> &'static str {
        match kind {
            ExportKind::Cars => "car_listings",
            ExportKind::Users => "users",
        }
    }

    fn select(kind: ExportKind, predicate: &Predicate) -> QueryBuilder<'static, Sqlite> {
        let mut builder = QueryBuilder::new(format!("SELECT * FROM {}", Self::table(kind)));
        predicate.push_where(&mut builder);
        builder.push(" ORDER BY id");
        builder
    }
}

#[async_trait]
impl ExportRepository for SqliteExportRepository {
    async fn count(&self, kind: ExportKind, predicate: &Predicate) -> DomainResult<u64> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*) FROM {}", Self::table(kind)));
        predicate.push_where(&mut builder);

        let total: i64 = builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(total as u64)
    }

    async fn fetch_cars(&self, predicate: &Predicate) -> DomainResult<Vec<CarListing>> {
        let mut builder = Self::select(ExportKind::Cars, predicate);
        let rows = builder
            .build_query_as::<CarListingRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        rows.into_iter().map(CarListingRow::into_entity).collect()
    }

    async fn fetch_users(&self, predicate: &Predicate) -> DomainResult<Vec<User>> {
        let mut builder = Self::select(ExportKind::Users, predicate);
        let rows = builder
            .build_query_as::<UserRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        rows.into_iter().map(UserRow::into_entity).collect()
    }

    async fn first_photos(&self, listing_ids: &[i64]) -> DomainResult<HashMap<i64, String>> {
        let mut first = HashMap::new();

        for chunk in listing_ids.chunks(PHOTO_LOOKUP_CHUNK) {
            let mut builder = QueryBuilder::<Sqlite>::new(
                "SELECT listing_id, photo_url FROM car_photos WHERE listing_id IN (",
            );
            let mut separated = builder.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            separated.push_unseparated(") ORDER BY id");

            let rows: Vec<(i64, String)> = builder
                .build_query_as()
                .fetch_all(&self.pool)
                .await
                .map_err(DbError::from)?;

            for (listing_id, url) in rows {
                first.entry(listing_id).or_insert(url);
            }
        }

        Ok(first)
    }
}
