pub mod repository;
pub mod service;
pub mod types;

pub use repository::{SqliteStatisticsRepository, StatisticsRepository};
pub use service::StatisticsService;
pub use types::{DashboardStats, StatisticsPeriod, StatisticsQuery};
