use crate::errors::DomainResult;
use crate::types::format_timestamp;
use crate::validation::{ensure_ordered, non_blank, parse_date_bound, DateBound};
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Statuses always present in the status breakdown, even with a zero count
pub const TRACKED_STATUSES: &[&str] = &["Продано", "Активно", "Долго продается", "Появилось недавно"];

/// Months of history the revenue target is derived from
pub const TARGET_LOOKBACK_MONTHS: u32 = 6;

/// Bucket size for period statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatisticsPeriod {
    #[default]
    Monthly,
    Quarterly,
    Annually,
}

impl StatisticsPeriod {
    /// SQL expression yielding the bucket label of a listing (`2024-03`, `2024-Q1`, `2024`)
    pub fn bucket_sql(&self) -> &'static str {
        match self {
            StatisticsPeriod::Monthly => "substr(created_at, 1, 7)",
            StatisticsPeriod::Quarterly => {
                "substr(created_at, 1, 4) || '-Q' || ((CAST(substr(created_at, 6, 2) AS INTEGER) + 2) / 3)"
            }
            StatisticsPeriod::Annually => "substr(created_at, 1, 4)",
        }
    }
}

/// Query parameters shared by every statistics endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatisticsQuery {
    pub period: Option<StatisticsPeriod>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

impl StatisticsQuery {
    pub fn window(&self) -> DomainResult<DateWindow> {
        let from = non_blank(&self.date_from)
            .map(|v| parse_date_bound(v, "date_from", DateBound::Start))
            .transpose()?;
        let to = non_blank(&self.date_to)
            .map(|v| parse_date_bound(v, "date_to", DateBound::End))
            .transpose()?;
        ensure_ordered(from.as_ref(), to.as_ref(), "date_from", "date_to")?;
        Ok(DateWindow { from, to })
    }
}

/// Requested reporting window; either end may be open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateWindow {
    pub fn range(&self) -> TimeRange {
        TimeRange {
            start: self.from.as_ref().map(format_timestamp),
            end: self.to.as_ref().map(format_timestamp),
            end_exclusive: false,
        }
    }

    /// Window the overview counts are compared against.
    ///
    /// With a start date it is the span of equal length ending (exclusively) at
    /// that start; an open end gives an empty span. Without one it is the
    /// previous calendar month.
    pub fn overview_baseline(&self, now: DateTime<Utc>) -> TimeRange {
        match self.from {
            Some(from) => {
                let length = self.to.map(|to| to - from).unwrap_or_else(Duration::zero);
                TimeRange {
                    start: Some(format_timestamp(&(from - length))),
                    end: Some(format_timestamp(&from)),
                    end_exclusive: true,
                }
            }
            None => previous_month(now),
        }
    }

    /// Window the revenue change is compared against: the span of equal
    /// length right before a closed window, else the previous calendar month
    pub fn revenue_baseline(&self, now: DateTime<Utc>) -> TimeRange {
        match (self.from, self.to) {
            (Some(from), Some(to)) => {
                let end = from - Duration::milliseconds(1);
                TimeRange {
                    start: Some(format_timestamp(&(end - (to - from)))),
                    end: Some(format_timestamp(&end)),
                    end_exclusive: false,
                }
            }
            _ => previous_month(now),
        }
    }
}

/// Bounds on `created_at` as stored timestamp strings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<String>,
    pub end: Option<String>,
    pub end_exclusive: bool,
}

impl TimeRange {
    pub fn since(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(format_timestamp(&start)),
            ..Default::default()
        }
    }
}

/// Whole previous calendar month (UTC), both ends inclusive
pub fn previous_month(now: DateTime<Utc>) -> TimeRange {
    let month_start = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or(now);
    let previous_start = month_start.checked_sub_months(Months::new(1)).unwrap_or(month_start);

    TimeRange {
        start: Some(format_timestamp(&previous_start)),
        end: Some(format_timestamp(&(month_start - Duration::milliseconds(1)))),
        end_exclusive: false,
    }
}

/// Percentage change rounded to two decimals; growth from zero counts as 100%
pub fn change_percent(current: f64, previous: f64) -> f64 {
    let percent = if previous > 0.0 {
        (current - previous) / previous * 100.0
    } else if current > 0.0 {
        100.0
    } else {
        0.0
    };
    round2(percent)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Current count next to its baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountComparison {
    pub total: i64,
    pub previous: i64,
    pub change: i64,
    pub change_percent: f64,
    pub is_positive: bool,
}

impl CountComparison {
    pub fn new(total: i64, previous: i64) -> Self {
        Self {
            total,
            previous,
            change: total - previous,
            change_percent: change_percent(total as f64, previous as f64),
            is_positive: total >= previous,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewStats {
    pub cars: CountComparison,
    pub users: CountComparison,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyCount {
    pub month: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

/// One bucket of listings grouped by creation period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodBucket {
    pub period: String,
    pub count: i64,
    pub total_revenue: f64,
}

/// Listed value against a target derived from recent months
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetStats {
    pub target: f64,
    pub revenue: f64,
    pub count: i64,
    pub achievement_percent: f64,
    pub change_percent: f64,
    pub is_positive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub overview: OverviewStats,
    pub monthly_cars: Vec<MonthlyCount>,
    pub status_stats: Vec<StatusCount>,
    pub period_stats: Vec<PeriodBucket>,
    pub target_stats: TargetStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_previous_month_spans_whole_month() {
        let range = previous_month(Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap());
        assert_eq!(range.start.as_deref(), Some("2024-02-01T00:00:00.000Z"));
        assert_eq!(range.end.as_deref(), Some("2024-02-29T23:59:59.999Z"));

        let range = previous_month(at(2024, 1, 10));
        assert_eq!(range.start.as_deref(), Some("2023-12-01T00:00:00.000Z"));
    }

    #[test]
    fn test_baselines_mirror_the_window() {
        let query = StatisticsQuery {
            period: None,
            date_from: Some("2024-03-01".to_string()),
            date_to: Some("2024-03-10".to_string()),
        };
        let window = query.window().unwrap();
        let now = at(2030, 1, 1);

        let overview = window.overview_baseline(now);
        assert_eq!(overview.end.as_deref(), Some("2024-03-01T00:00:00.000Z"));
        assert!(overview.end_exclusive);
        assert_eq!(overview.start.as_deref(), Some("2024-02-20T00:00:00.001Z"));

        let revenue = window.revenue_baseline(now);
        assert_eq!(revenue.end.as_deref(), Some("2024-02-29T23:59:59.999Z"));
        assert_eq!(revenue.start.as_deref(), Some("2024-02-20T00:00:00.000Z"));

        let open = DateWindow { from: window.from, to: None };
        let empty = open.overview_baseline(now);
        assert_eq!(empty.start, empty.end);
        assert_eq!(open.revenue_baseline(now), previous_month(now));
    }

    #[test]
    fn test_change_percent() {
        assert_eq!(change_percent(15.0, 10.0), 50.0);
        assert_eq!(change_percent(1.0, 3.0), -66.67);
        assert_eq!(change_percent(4.0, 0.0), 100.0);
        assert_eq!(change_percent(0.0, 0.0), 0.0);

        let comparison = CountComparison::new(2, 5);
        assert_eq!(comparison.change, -3);
        assert!(!comparison.is_positive);
    }

    #[test]
    fn test_query_rejects_inverted_window() {
        let query = StatisticsQuery {
            period: Some(StatisticsPeriod::Annually),
            date_from: Some("2024-05-01".to_string()),
            date_to: Some("2024-04-01".to_string()),
        };
        assert!(query.window().is_err());
    }
}
