use crate::auth::AuthContext;
use crate::domains::statistics::repository::StatisticsRepository;
use crate::domains::statistics::types::{
    change_percent, round2, CountComparison, DashboardStats, DateWindow, MonthlyCount, OverviewStats,
    PeriodBucket, StatisticsPeriod, StatisticsQuery, StatusCount, TargetStats, TimeRange,
    TARGET_LOOKBACK_MONTHS, TRACKED_STATUSES,
};
use crate::errors::{DomainResult, ServiceResult};
use crate::types::Permission;
use chrono::{DateTime, Months, Utc};
use std::sync::Arc;

/// Dashboard aggregates over listings and users
pub struct StatisticsService {
    repo: Arc<dyn StatisticsRepository>,
}

impl StatisticsService {
    pub fn new(repo: Arc<dyn StatisticsRepository>) -> Self {
        Self { repo }
    }

    pub async fn overview(&self, query: StatisticsQuery, auth: &AuthContext) -> ServiceResult<OverviewStats> {
        auth.authorize(Permission::ViewStatistics)?;
        Ok(self.overview_at(query.window()?, Utc::now()).await?)
    }

    pub async fn monthly_cars(&self, query: StatisticsQuery, auth: &AuthContext) -> ServiceResult<Vec<MonthlyCount>> {
        auth.authorize(Permission::ViewStatistics)?;
        Ok(self.repo.monthly_cars(&query.window()?.range()).await?)
    }

    pub async fn status(&self, query: StatisticsQuery, auth: &AuthContext) -> ServiceResult<Vec<StatusCount>> {
        auth.authorize(Permission::ViewStatistics)?;
        Ok(self.status_breakdown(&query.window()?).await?)
    }

    pub async fn period(&self, query: StatisticsQuery, auth: &AuthContext) -> ServiceResult<Vec<PeriodBucket>> {
        auth.authorize(Permission::ViewStatistics)?;
        let window = query.window()?;
        Ok(self
            .repo
            .period_buckets(query.period.unwrap_or_default(), &window.range())
            .await?)
    }

    pub async fn target(&self, query: StatisticsQuery, auth: &AuthContext) -> ServiceResult<TargetStats> {
        auth.authorize(Permission::ViewStatistics)?;
        Ok(self.target_at(query.window()?, Utc::now()).await?)
    }

    /// Every dashboard block for one window
    pub async fn dashboard(&self, query: StatisticsQuery, auth: &AuthContext) -> ServiceResult<DashboardStats> {
        auth.authorize(Permission::ViewStatistics)?;

        let window = query.window()?;
        let range = window.range();
        let now = Utc::now();

        let (overview, monthly_cars, status_stats, period_stats, target_stats) = tokio::try_join!(
            self.overview_at(window, now),
            self.repo.monthly_cars(&range),
            self.status_breakdown(&window),
            self.repo.period_buckets(query.period.unwrap_or_default(), &range),
            self.target_at(window, now),
        )?;

        Ok(DashboardStats {
            overview,
            monthly_cars,
            status_stats,
            period_stats,
            target_stats,
        })
    }

    async fn overview_at(&self, window: DateWindow, now: DateTime<Utc>) -> DomainResult<OverviewStats> {
        let current = window.range();
        let baseline = window.overview_baseline(now);

        let cars = self.repo.count_cars(&current).await?;
        let users = self.repo.count_users(&current).await?;
        let previous_cars = self.repo.count_cars(&baseline).await?;
        let previous_users = self.repo.count_users(&baseline).await?;

        Ok(OverviewStats {
            cars: CountComparison::new(cars, previous_cars),
            users: CountComparison::new(users, previous_users),
        })
    }

    /// Tracked statuses first (zero when absent), then any other status seen
    async fn status_breakdown(&self, window: &DateWindow) -> DomainResult<Vec<StatusCount>> {
        let counts = self.repo.status_counts(&window.range()).await?;

        let mut breakdown: Vec<StatusCount> = TRACKED_STATUSES
            .iter()
            .map(|status| StatusCount { status: status.to_string(), count: 0 })
            .collect();
        for found in counts {
            match breakdown.iter_mut().find(|s| s.status == found.status) {
                Some(slot) => slot.count = found.count,
                None => breakdown.push(found),
            }
        }
        Ok(breakdown)
    }

    async fn target_at(&self, window: DateWindow, now: DateTime<Utc>) -> DomainResult<TargetStats> {
        let (revenue, count) = self.repo.revenue(&window.range()).await?;

        let lookback_start = now
            .checked_sub_months(Months::new(TARGET_LOOKBACK_MONTHS))
            .unwrap_or(now);
        let recent = self
            .repo
            .period_buckets(StatisticsPeriod::Monthly, &TimeRange::since(lookback_start))
            .await?;
        let monthly_average = if recent.is_empty() {
            0.0
        } else {
            recent.iter().map(|b| b.total_revenue).sum::<f64>() / recent.len() as f64
        };
        let target = monthly_average * 12.0;

        let (previous_revenue, _) = self.repo.revenue(&window.revenue_baseline(now)).await?;

        let achievement_percent = if target > 0.0 { round2(revenue / target * 100.0) } else { 0.0 };

        Ok(TargetStats {
            target,
            revenue,
            count,
            achievement_percent,
            change_percent: change_percent(revenue, previous_revenue),
            is_positive: revenue >= previous_revenue,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::statistics::repository::tests::{seed_car, seed_user};
    use crate::domains::statistics::repository::SqliteStatisticsRepository;
    use crate::errors::{DomainError, ServiceError};
    use crate::test_support::migrated_pool;
    use crate::types::{format_timestamp, UserRole};
    use chrono::TimeZone;
    use sqlx::SqlitePool;

    fn ctx(role: UserRole) -> AuthContext {
        AuthContext::new(1, "boss@example.com".to_string(), "Boss".to_string(), role)
    }

    async fn fixture() -> (StatisticsService, SqlitePool) {
        let pool = migrated_pool().await;
        let service = StatisticsService::new(Arc::new(SqliteStatisticsRepository::new(pool.clone())));
        (service, pool)
    }

    fn query(from: &str, to: &str) -> StatisticsQuery {
        StatisticsQuery {
            period: None,
            date_from: Some(from.to_string()),
            date_to: Some(to.to_string()),
        }
    }

    #[tokio::test]
    async fn test_overview_compares_with_preceding_span() {
        let (service, pool) = fixture().await;
        seed_car(&pool, "2024-03-02T10:00:00.000Z", 100.0, None).await;
        seed_car(&pool, "2024-03-05T10:00:00.000Z", 100.0, None).await;
        seed_car(&pool, "2024-03-08T10:00:00.000Z", 100.0, None).await;
        seed_car(&pool, "2024-02-25T10:00:00.000Z", 100.0, None).await;
        seed_user(&pool, "old@example.com", "2024-02-22T00:00:00.000Z").await;

        let overview = service
            .overview(query("2024-03-01", "2024-03-10"), &ctx(UserRole::User))
            .await
            .unwrap();

        assert_eq!(overview.cars, CountComparison::new(3, 1));
        assert_eq!(overview.cars.change_percent, 200.0);
        assert_eq!(overview.users.total, 0);
        assert_eq!(overview.users.previous, 1);
        assert_eq!(overview.users.change_percent, -100.0);
        assert!(!overview.users.is_positive);
    }

    #[tokio::test]
    async fn test_status_breakdown_keeps_tracked_order() {
        let (service, pool) = fixture().await;
        seed_car(&pool, "2024-03-02T10:00:00.000Z", 1.0, Some("Продано")).await;
        seed_car(&pool, "2024-03-03T10:00:00.000Z", 1.0, Some("Продано")).await;
        seed_car(&pool, "2024-03-04T10:00:00.000Z", 1.0, Some("Снято")).await;

        let statuses = service
            .status(StatisticsQuery::default(), &ctx(UserRole::Manager))
            .await
            .unwrap();

        let names: Vec<&str> = statuses.iter().map(|s| s.status.as_str()).collect();
        assert_eq!(names, vec!["Продано", "Активно", "Долго продается", "Появилось недавно", "Снято"]);
        assert_eq!(statuses[0].count, 2);
        assert_eq!(statuses[1].count, 0);
        assert_eq!(statuses[4].count, 1);
    }

    #[tokio::test]
    async fn test_target_from_recent_monthly_average() {
        let (service, pool) = fixture().await;
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let ts = |y, m, d| format_timestamp(&Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap());

        seed_car(&pool, &ts(2024, 4, 10), 1000.0, None).await;
        seed_car(&pool, &ts(2024, 5, 10), 2000.0, None).await;
        seed_car(&pool, &ts(2024, 5, 20), 1000.0, None).await;
        // Older than the lookback, counted in revenue but not in the target
        seed_car(&pool, &ts(2023, 1, 10), 9000.0, None).await;

        let stats = service.target_at(DateWindow::default(), now).await.unwrap();

        // (1000 + 3000) / 2 months * 12
        assert_eq!(stats.target, 24000.0);
        assert_eq!(stats.revenue, 13000.0);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.achievement_percent, 54.17);
        // baseline is May 2024: 3000
        assert_eq!(stats.change_percent, 333.33);
        assert!(stats.is_positive);
    }

    #[tokio::test]
    async fn test_dashboard_and_period_default() {
        let (service, pool) = fixture().await;
        seed_car(&pool, "2024-01-15T10:00:00.000Z", 10.0, Some("Активно")).await;
        seed_car(&pool, "2024-05-15T10:00:00.000Z", 20.0, Some("Активно")).await;

        let dashboard = service
            .dashboard(
                StatisticsQuery { period: Some(StatisticsPeriod::Quarterly), ..query("2024-01-01", "2024-12-31") },
                &ctx(UserRole::User),
            )
            .await
            .unwrap();
        assert_eq!(dashboard.overview.cars.total, 2);
        assert_eq!(dashboard.monthly_cars.len(), 2);
        assert_eq!(dashboard.period_stats[1].period, "2024-Q2");
        assert_eq!(dashboard.status_stats[1], StatusCount { status: "Активно".to_string(), count: 2 });
        assert_eq!(dashboard.target_stats.revenue, 30.0);

        let monthly = service
            .period(StatisticsQuery::default(), &ctx(UserRole::User))
            .await
            .unwrap();
        assert_eq!(monthly[0].period, "2024-01");
    }

    #[tokio::test]
    async fn test_malformed_date_rejected() {
        let (service, _) = fixture().await;
        let err = service
            .monthly_cars(query("yesterday", "2024-01-01"), &ctx(UserRole::User))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    }
}
