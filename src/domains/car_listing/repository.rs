use crate::domains::car_listing::types::{
    CarListing, CarListingQuery, CarListingRow, CarPhoto, NewCarListing, UpdateCarListing,
};
use crate::errors::{DbError, DomainError, DomainResult};
use crate::types::{now_timestamp, PaginationParams};
use crate::validation::{escape_like, non_blank};
use async_trait::async_trait;
use sqlx::{query, query_as, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;

/// Columns matched by the free-text `search` parameter
const SEARCH_COLUMNS: &[&str] = &["title", "make", "model", "body_type", "location", "seller_name"];

#[async_trait]
pub trait CarListingRepository: Send + Sync {
    /// Insert a listing together with its photos
    async fn create(&self, listing: NewCarListing) -> DomainResult<CarListing>;

    async fn find_by_id(&self, id: i64) -> DomainResult<CarListing>;

    async fn find_all(
        &self,
        query: &CarListingQuery,
        params: PaginationParams,
    ) -> DomainResult<(Vec<CarListing>, u64)>;

    /// Photos of one listing in id order
    async fn find_photos(&self, listing_id: i64) -> DomainResult<Vec<CarPhoto>>;

    /// Photo URLs per listing, each list in id order
    async fn find_photo_urls(&self, listing_ids: &[i64]) -> DomainResult<HashMap<i64, Vec<String>>>;

    async fn update(&self, id: i64, update: UpdateCarListing) -> DomainResult<CarListing>;

    /// Delete a listing; its photos go with it
    async fn delete(&self, id: i64) -> DomainResult<()>;
}

pub struct SqliteCarListingRepository {
    pool: SqlitePool,
}

impl SqliteCarListingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn push_filters(query: &CarListingQuery, builder: &mut QueryBuilder<'_, Sqlite>) {
        builder.push(" WHERE 1 = 1");

        let exact = [
            ("make", &query.make),
            ("model", &query.model),
            ("year", &query.year),
            ("exterior_color", &query.exterior_color),
            ("body_type", &query.body_type),
            ("fuel_type", &query.fuel_type),
        ];
        for (column, value) in exact {
            if let Some(value) = non_blank(value) {
                builder.push(format!(" AND {} = ", column)).push_bind(value.to_string());
            }
        }

        if let Some(min) = query.min_price {
            builder.push(" AND price_raw >= ").push_bind(min);
        }
        if let Some(max) = query.max_price {
            builder.push(" AND price_raw <= ").push_bind(max);
        }
        if let Some(max) = query.max_kilometers {
            builder.push(" AND kilometers <= ").push_bind(max);
        }
        if let Some(location) = non_blank(&query.location) {
            builder
                .push(" AND LOWER(location) LIKE LOWER(")
                .push_bind(format!("%{}%", escape_like(location)))
                .push(") ESCAPE '\\'");
        }
        if let Some(search) = non_blank(&query.search) {
            let pattern = format!("%{}%", escape_like(search));
            builder.push(" AND (");
            for (i, column) in SEARCH_COLUMNS.iter().enumerate() {
                if i > 0 {
                    builder.push(" OR ");
                }
                builder
                    .push(format!("LOWER({}) LIKE LOWER(", column))
                    .push_bind(pattern.clone())
                    .push(") ESCAPE '\\'");
            }
            builder.push(")");
        }
    }

    async fn insert_photos(conn: &mut SqliteConnection, listing_id: i64, photos: &[String]) -> DomainResult<()> {
        for url in photos {
            query("INSERT INTO car_photos (listing_id, photo_url) VALUES (?, ?)")
                .bind(listing_id)
                .bind(url)
                .execute(&mut *conn)
                .await
                .map_err(DbError::from)?;
        }
        Ok(())
    }
}

#[async_trait]
impl CarListingRepository for SqliteCarListingRepository {
    async fn create(&self, listing: NewCarListing) -> DomainResult<CarListing> {
        let now = now_timestamp();
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let result = query(
            "INSERT INTO car_listings (short_url, title, make, model, year, body_type, horsepower, fuel_type,
                motors_trim, kilometers, price_formatted, price_raw, currency, exterior_color, location, phone,
                seller_name, seller_type, seller_logo, seller_profile_link, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(listing.short_url.trim())
        .bind(&listing.title)
        .bind(&listing.make)
        .bind(&listing.model)
        .bind(&listing.year)
        .bind(&listing.body_type)
        .bind(&listing.horsepower)
        .bind(&listing.fuel_type)
        .bind(&listing.motors_trim)
        .bind(listing.kilometers)
        .bind(&listing.price_formatted)
        .bind(listing.price_raw)
        .bind(&listing.currency)
        .bind(&listing.exterior_color)
        .bind(&listing.location)
        .bind(&listing.phone)
        .bind(&listing.seller_name)
        .bind(&listing.seller_type)
        .bind(&listing.seller_logo)
        .bind(&listing.seller_profile_link)
        .bind(&listing.status)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        let id = result.last_insert_rowid();
        Self::insert_photos(&mut tx, id, &listing.photos).await?;
        tx.commit().await.map_err(DbError::from)?;

        self.find_by_id(id).await
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<CarListing> {
        query_as::<_, CarListingRow>("SELECT * FROM car_listings WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| DomainError::EntityNotFound("CarListing".to_string(), id))?
            .into_entity()
    }

    async fn find_all(
        &self,
        query: &CarListingQuery,
        params: PaginationParams,
    ) -> DomainResult<(Vec<CarListing>, u64)> {
        let mut count_builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM car_listings");
        Self::push_filters(query, &mut count_builder);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from)?;

        let mut select_builder = QueryBuilder::<Sqlite>::new("SELECT * FROM car_listings");
        Self::push_filters(query, &mut select_builder);
        select_builder.push(" ORDER BY id LIMIT ").push_bind(params.limit as i64);
        select_builder.push(" OFFSET ").push_bind(params.offset as i64);

        let rows = select_builder
            .build_query_as::<CarListingRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        let listings = rows
            .into_iter()
            .map(CarListingRow::into_entity)
            .collect::<DomainResult<Vec<_>>>()?;

        Ok((listings, total as u64))
    }

    async fn find_photos(&self, listing_id: i64) -> DomainResult<Vec<CarPhoto>> {
        let photos = query_as::<_, CarPhoto>("SELECT * FROM car_photos WHERE listing_id = ? ORDER BY id")
            .bind(listing_id)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(photos)
    }

    async fn find_photo_urls(&self, listing_ids: &[i64]) -> DomainResult<HashMap<i64, Vec<String>>> {
        if listing_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT listing_id, photo_url FROM car_photos WHERE listing_id IN (",
        );
        let mut separated = builder.separated(", ");
        for id in listing_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY id");

        let rows: Vec<(i64, String)> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        let mut urls: HashMap<i64, Vec<String>> = HashMap::new();
        for (listing_id, url) in rows {
            urls.entry(listing_id).or_default().push(url);
        }
        Ok(urls)
    }

    async fn update(&self, id: i64, update: UpdateCarListing) -> DomainResult<CarListing> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let current = query_as::<_, CarListingRow>("SELECT * FROM car_listings WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| DomainError::EntityNotFound("CarListing".to_string(), id))?;

        query(
            "UPDATE car_listings SET short_url = ?, title = ?, make = ?, model = ?, year = ?, body_type = ?,
                horsepower = ?, fuel_type = ?, motors_trim = ?, kilometers = ?, price_formatted = ?, price_raw = ?,
                currency = ?, exterior_color = ?, location = ?, phone = ?, seller_name = ?, seller_type = ?,
                seller_logo = ?, seller_profile_link = ?, status = ?, updated_at = ?
             WHERE id = ?"
        )
        .bind(update.short_url.unwrap_or(current.short_url))
        .bind(update.title.unwrap_or(current.title))
        .bind(update.make.unwrap_or(current.make))
        .bind(update.model.unwrap_or(current.model))
        .bind(update.year.unwrap_or(current.year))
        .bind(update.body_type.unwrap_or(current.body_type))
        .bind(update.horsepower.unwrap_or(current.horsepower))
        .bind(update.fuel_type.unwrap_or(current.fuel_type))
        .bind(update.motors_trim.unwrap_or(current.motors_trim))
        .bind(update.kilometers.unwrap_or(current.kilometers))
        .bind(update.price_formatted.unwrap_or(current.price_formatted))
        .bind(update.price_raw.unwrap_or(current.price_raw))
        .bind(update.currency.unwrap_or(current.currency))
        .bind(update.exterior_color.unwrap_or(current.exterior_color))
        .bind(update.location.unwrap_or(current.location))
        .bind(update.phone.unwrap_or(current.phone))
        .bind(update.seller_name.unwrap_or(current.seller_name))
        .bind(update.seller_type.unwrap_or(current.seller_type))
        .bind(update.seller_logo.or(current.seller_logo))
        .bind(update.seller_profile_link.or(current.seller_profile_link))
        .bind(update.status.or(current.status))
        .bind(now_timestamp())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        if let Some(photos) = &update.photos {
            query("DELETE FROM car_photos WHERE listing_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(DbError::from)?;
            Self::insert_photos(&mut tx, id, photos).await?;
        }

        tx.commit().await.map_err(DbError::from)?;
        self.find_by_id(id).await
    }

    async fn delete(&self, id: i64) -> DomainResult<()> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        query("DELETE FROM car_photos WHERE listing_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(DbError::from)?;

        let result = query("DELETE FROM car_listings WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::EntityNotFound("CarListing".to_string(), id));
        }

        tx.commit().await.map_err(DbError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::migrated_pool;

    fn listing(make: &str, model: &str, price: f64, photos: &[&str]) -> NewCarListing {
        NewCarListing {
            short_url: format!("https://cars.example/{}-{}", make, model),
            title: format!("{} {}", make, model),
            make: make.to_string(),
            model: model.to_string(),
            price_raw: price,
            location: "Dubai Marina".to_string(),
            photos: photos.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    async fn seeded() -> SqliteCarListingRepository {
        let repo = SqliteCarListingRepository::new(migrated_pool().await);
        repo.create(listing("Toyota", "Camry", 20000.0, &["a.jpg", "b.jpg"])).await.unwrap();
        repo.create(listing("Toyota", "Corolla", 12000.0, &[])).await.unwrap();
        repo.create(listing("BMW", "X5", 55000.0, &["x.jpg"])).await.unwrap();
        repo
    }

    #[tokio::test]
    async fn test_filters_and_search() {
        let repo = seeded().await;
        let params = PaginationParams { limit: 10, offset: 0 };

        let query = CarListingQuery { make: Some("Toyota".to_string()), max_price: Some(15000.0), ..Default::default() };
        let (rows, total) = repo.find_all(&query, params).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].model, "Corolla");

        let query = CarListingQuery { search: Some("x5".to_string()), ..Default::default() };
        let (rows, _) = repo.find_all(&query, params).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].make, "BMW");

        let query = CarListingQuery { location: Some("marina".to_string()), ..Default::default() };
        let (_, total) = repo.find_all(&query, PaginationParams { limit: 2, offset: 0 }).await.unwrap();
        assert_eq!(total, 3);
    }

    #[tokio::test]
    async fn test_photo_urls_grouped_in_id_order() {
        let repo = seeded().await;
        let urls = repo.find_photo_urls(&[1, 2, 3]).await.unwrap();
        assert_eq!(urls[&1], vec!["a.jpg".to_string(), "b.jpg".to_string()]);
        assert!(!urls.contains_key(&2));
        assert_eq!(urls[&3], vec!["x.jpg".to_string()]);
    }

    #[tokio::test]
    async fn test_update_replaces_photos_and_keeps_fields() {
        let repo = seeded().await;
        let updated = repo
            .update(1, UpdateCarListing {
                price_raw: Some(18500.0),
                photos: Some(vec!["c.jpg".to_string()]),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(updated.price_raw, 18500.0);
        assert_eq!(updated.model, "Camry");

        let photos = repo.find_photos(1).await.unwrap();
        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0].photo_url, "c.jpg");
    }

    #[tokio::test]
    async fn test_delete_removes_photos() {
        let repo = seeded().await;
        repo.delete(1).await.unwrap();
        assert!(repo.find_photos(1).await.unwrap().is_empty());
        assert!(matches!(repo.delete(1).await, Err(DomainError::EntityNotFound(_, 1))));
    }
}
