use crate::auth::AuthService;
use crate::domains::car_listing::{CarListingService, SqliteCarListingRepository};
use crate::domains::export::{ExportService, SqliteExportRepository};
use crate::domains::history::{HistoryService, SqliteHistoryRepository};
use crate::domains::parsing_error::{ParsingErrorService, SqliteParsingErrorRepository};
use crate::domains::statistics::{SqliteStatisticsRepository, StatisticsService};
use crate::domains::user::{SqliteUserRepository, UserService};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Services shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub car_listings: Arc<CarListingService>,
    pub history: Arc<HistoryService>,
    pub export: Arc<ExportService>,
    pub statistics: Arc<StatisticsService>,
    pub parsing_errors: Arc<ParsingErrorService>,
}

impl AppState {
    pub fn new(pool: SqlitePool, export_max_records: usize) -> Self {
        let user_repo = Arc::new(SqliteUserRepository::new(pool.clone()));
        let history = Arc::new(HistoryService::new(Arc::new(SqliteHistoryRepository::new(pool.clone()))));
        let auth = Arc::new(AuthService::new(user_repo.clone()));

        let users = Arc::new(UserService::new(user_repo, auth.clone(), history.clone()));
        let car_listings = Arc::new(CarListingService::new(
            Arc::new(SqliteCarListingRepository::new(pool.clone())),
            history.clone(),
        ));
        let statistics = Arc::new(StatisticsService::new(Arc::new(SqliteStatisticsRepository::new(pool.clone()))));
        let parsing_errors = Arc::new(ParsingErrorService::new(Arc::new(SqliteParsingErrorRepository::new(
            pool.clone(),
        ))));
        let export = Arc::new(ExportService::new(
            Arc::new(SqliteExportRepository::new(pool)),
            history.clone(),
            export_max_records,
        ));

        Self {
            auth,
            users,
            car_listings,
            history,
            export,
            statistics,
            parsing_errors,
        }
    }
}
