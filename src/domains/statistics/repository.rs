use crate::domains::statistics::types::{MonthlyCount, PeriodBucket, StatisticsPeriod, StatusCount, TimeRange};
use crate::errors::{DbError, DomainResult};
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

/// Aggregate reads over listings and users
#[async_trait]
pub trait StatisticsRepository: Send + Sync {
    async fn count_cars(&self, range: &TimeRange) -> DomainResult<i64>;

    async fn count_users(&self, range: &TimeRange) -> DomainResult<i64>;

    /// Listings per `YYYY-MM`, oldest first
    async fn monthly_cars(&self, range: &TimeRange) -> DomainResult<Vec<MonthlyCount>>;

    /// Listings per non-null status
    async fn status_counts(&self, range: &TimeRange) -> DomainResult<Vec<StatusCount>>;

    /// Listing count and summed `price_raw` per period bucket, oldest first
    async fn period_buckets(&self, period: StatisticsPeriod, range: &TimeRange) -> DomainResult<Vec<PeriodBucket>>;

    /// Summed `price_raw` and listing count
    async fn revenue(&self, range: &TimeRange) -> DomainResult<(f64, i64)>;
}

pub struct SqliteStatisticsRepository {
    pool: SqlitePool,
}

impl SqliteStatisticsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn push_range(range: &TimeRange, builder: &mut QueryBuilder<'_, Sqlite>) {
        builder.push(" WHERE 1 = 1");
        if let Some(start) = &range.start {
            builder.push(" AND created_at >= ").push_bind(start.clone());
        }
        if let Some(end) = &range.end {
            let op = if range.end_exclusive { " AND created_at < " } else { " AND created_at <= " };
            builder.push(op).push_bind(end.clone());
        }
    }

    async fn count(&self, table: &str, range: &TimeRange) -> DomainResult<i64> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*) FROM {}", table));
        Self::push_range(range, &mut builder);
        Ok(builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from)?)
    }
}

#[async_trait]
impl StatisticsRepository for SqliteStatisticsRepository {
    async fn count_cars(&self, range: &TimeRange) -> DomainResult<i64> {
        self.count("car_listings", range).await
    }

    async fn count_users(&self, range: &TimeRange) -> DomainResult<i64> {
        self.count("users", range).await
    }

    async fn monthly_cars(&self, range: &TimeRange) -> DomainResult<Vec<MonthlyCount>> {
        let buckets = self.period_buckets(StatisticsPeriod::Monthly, range).await?;
        Ok(buckets
            .into_iter()
            .map(|bucket| MonthlyCount { month: bucket.period, count: bucket.count })
            .collect())
    }

    async fn status_counts(&self, range: &TimeRange) -> DomainResult<Vec<StatusCount>> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT status, COUNT(*) FROM car_listings");
        Self::push_range(range, &mut builder);
        builder.push(" AND status IS NOT NULL GROUP BY status ORDER BY status");

        let rows: Vec<(String, i64)> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(rows.into_iter().map(|(status, count)| StatusCount { status, count }).collect())
    }

    async fn period_buckets(&self, period: StatisticsPeriod, range: &TimeRange) -> DomainResult<Vec<PeriodBucket>> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} AS bucket, COUNT(*), SUM(price_raw) FROM car_listings",
            period.bucket_sql()
        ));
        Self::push_range(range, &mut builder);
        builder.push(" GROUP BY bucket ORDER BY bucket");

        let rows: Vec<(String, i64, Option<f64>)> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .map(|(period, count, revenue)| PeriodBucket {
                period,
                count,
                total_revenue: revenue.unwrap_or(0.0),
            })
            .collect())
    }

    async fn revenue(&self, range: &TimeRange) -> DomainResult<(f64, i64)> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT SUM(price_raw), COUNT(*) FROM car_listings");
        Self::push_range(range, &mut builder);

        let (revenue, count): (Option<f64>, i64) = builder
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok((revenue.unwrap_or(0.0), count))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::test_support::migrated_pool;

    /// Insert a listing with a fixed creation time
    pub(crate) async fn seed_car(pool: &SqlitePool, created_at: &str, price: f64, status: Option<&str>) {
        sqlx::query(
            "INSERT INTO car_listings (short_url, price_raw, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(format!("https://cars.example/{}", created_at))
        .bind(price)
        .bind(status)
        .bind(created_at)
        .bind(created_at)
        .execute(pool)
        .await
        .unwrap();
    }

    pub(crate) async fn seed_user(pool: &SqlitePool, email: &str, created_at: &str) {
        sqlx::query(
            "INSERT INTO users (email, password_hash, first_name, last_name, created_at, updated_at) VALUES (?, 'x', 'A', 'B', ?, ?)",
        )
        .bind(email)
        .bind(created_at)
        .bind(created_at)
        .execute(pool)
        .await
        .unwrap();
    }

    async fn seeded() -> SqliteStatisticsRepository {
        let pool = migrated_pool().await;
        seed_car(&pool, "2024-01-15T10:00:00.000Z", 1000.0, Some("Активно")).await;
        seed_car(&pool, "2024-02-01T00:00:00.000Z", 2500.5, Some("Продано")).await;
        seed_car(&pool, "2024-04-20T08:30:00.000Z", 500.0, None).await;
        seed_car(&pool, "2025-11-03T00:00:00.000Z", 4000.0, Some("Продано")).await;
        seed_user(&pool, "a@example.com", "2024-02-10T00:00:00.000Z").await;
        SqliteStatisticsRepository::new(pool)
    }

    fn range(start: Option<&str>, end: Option<&str>, end_exclusive: bool) -> TimeRange {
        TimeRange {
            start: start.map(str::to_string),
            end: end.map(str::to_string),
            end_exclusive,
        }
    }

    #[tokio::test]
    async fn test_counts_respect_exclusive_end() {
        let repo = seeded().await;
        let inclusive = range(Some("2024-01-01T00:00:00.000Z"), Some("2024-02-01T00:00:00.000Z"), false);
        let exclusive = TimeRange { end_exclusive: true, ..inclusive.clone() };

        assert_eq!(repo.count_cars(&inclusive).await.unwrap(), 2);
        assert_eq!(repo.count_cars(&exclusive).await.unwrap(), 1);
        assert_eq!(repo.count_cars(&TimeRange::default()).await.unwrap(), 4);
        assert_eq!(repo.count_users(&TimeRange::default()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_period_buckets() {
        let repo = seeded().await;
        let all = TimeRange::default();

        let quarters = repo.period_buckets(StatisticsPeriod::Quarterly, &all).await.unwrap();
        let labels: Vec<&str> = quarters.iter().map(|b| b.period.as_str()).collect();
        assert_eq!(labels, vec!["2024-Q1", "2024-Q2", "2025-Q4"]);
        assert_eq!(quarters[0].count, 2);
        assert_eq!(quarters[0].total_revenue, 3500.5);

        let years = repo.period_buckets(StatisticsPeriod::Annually, &all).await.unwrap();
        assert_eq!(years.len(), 2);
        assert_eq!(years[0].period, "2024");

        let months = repo.monthly_cars(&all).await.unwrap();
        assert_eq!(months[0], MonthlyCount { month: "2024-01".to_string(), count: 1 });
        assert_eq!(months.len(), 4);
    }

    #[tokio::test]
    async fn test_status_counts_skip_null() {
        let repo = seeded().await;
        let counts = repo.status_counts(&TimeRange::default()).await.unwrap();
        assert_eq!(counts.len(), 2);
        assert!(counts.contains(&StatusCount { status: "Продано".to_string(), count: 2 }));
    }

    #[tokio::test]
    async fn test_revenue_of_empty_range_is_zero() {
        let repo = seeded().await;
        let empty = range(Some("2030-01-01T00:00:00.000Z"), None, false);
        assert_eq!(repo.revenue(&empty).await.unwrap(), (0.0, 0));
        assert_eq!(repo.revenue(&TimeRange::default()).await.unwrap(), (8000.5, 4));
    }
}
