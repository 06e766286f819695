use crate::domains::parsing_error::types::{
    ErrorType, ErrorTypeStats, NewParsingError, ParserErrorTypeStats, ParserStats, ParsingError,
    ParsingErrorRow, ParsingErrorStats,
};
use crate::errors::{DbError, DomainError, DomainResult};
use crate::types::{now_timestamp, PaginationParams};
use async_trait::async_trait;
use sqlx::{query, query_as, QueryBuilder, Sqlite, SqlitePool};

const UNPROCESSED_SUM: &str = "SUM(CASE WHEN is_processed = 0 THEN 1 ELSE 0 END)";

/// Resolved listing constraints; dates are stored timestamp strings
#[derive(Debug, Clone, Default)]
pub struct ParsingErrorCriteria {
    pub parser_name: Option<String>,
    pub error_type: Option<ErrorType>,
    pub is_processed: Option<bool>,
    pub created_from: Option<String>,
    pub created_to: Option<String>,
    /// Only errors that carry partially parsed listing data
    pub with_car_data: bool,
}

impl ParsingErrorCriteria {
    fn push_where(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        builder.push(" WHERE 1 = 1");
        if let Some(parser_name) = &self.parser_name {
            builder
                .push(" AND LOWER(parser_name) = LOWER(")
                .push_bind(parser_name.clone())
                .push(")");
        }
        if let Some(error_type) = self.error_type {
            builder.push(" AND error_type = ").push_bind(error_type.as_str());
        }
        if let Some(is_processed) = self.is_processed {
            builder.push(" AND is_processed = ").push_bind(is_processed as i64);
        }
        if let Some(from) = &self.created_from {
            builder.push(" AND created_at >= ").push_bind(from.clone());
        }
        if let Some(to) = &self.created_to {
            builder.push(" AND created_at <= ").push_bind(to.clone());
        }
        if self.with_car_data {
            builder.push(" AND car_data IS NOT NULL");
        }
    }
}

#[async_trait]
pub trait ParsingErrorRepository: Send + Sync {
    async fn insert(&self, error: NewParsingError) -> DomainResult<ParsingError>;

    async fn find_by_id(&self, id: i64) -> DomainResult<ParsingError>;

    /// Newest first, with the total before paging
    async fn find_all(
        &self,
        criteria: &ParsingErrorCriteria,
        params: PaginationParams,
    ) -> DomainResult<(Vec<ParsingError>, u64)>;

    /// Flag as processed and stamp `processed_at`
    async fn mark_processed(&self, id: i64) -> DomainResult<ParsingError>;

    async fn stats(&self) -> DomainResult<ParsingErrorStats>;
}

pub struct SqliteParsingErrorRepository {
    pool: SqlitePool,
}

impl SqliteParsingErrorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn to_json(value: &Option<serde_json::Value>) -> DomainResult<Option<String>> {
        value
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| DomainError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl ParsingErrorRepository for SqliteParsingErrorRepository {
    async fn insert(&self, error: NewParsingError) -> DomainResult<ParsingError> {
        let result = query(
            "INSERT INTO parsing_errors (parser_name, url, error_type, error_name, error_message, error_stack, car_data, context, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&error.parser_name)
        .bind(&error.url)
        .bind(error.error_type.as_str())
        .bind(&error.error_name)
        .bind(&error.error_message)
        .bind(&error.error_stack)
        .bind(Self::to_json(&error.car_data)?)
        .bind(Self::to_json(&error.context)?)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        self.find_by_id(result.last_insert_rowid()).await
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<ParsingError> {
        query_as::<_, ParsingErrorRow>("SELECT * FROM parsing_errors WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| DomainError::EntityNotFound("ParsingError".to_string(), id))?
            .into_entity()
    }

    async fn find_all(
        &self,
        criteria: &ParsingErrorCriteria,
        params: PaginationParams,
    ) -> DomainResult<(Vec<ParsingError>, u64)> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM parsing_errors");
        criteria.push_where(&mut builder);
        let total = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from)?;

        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM parsing_errors");
        criteria.push_where(&mut builder);
        builder.push(" ORDER BY created_at DESC, id DESC");
        builder.push(" LIMIT ").push_bind(params.limit as i64);
        builder.push(" OFFSET ").push_bind(params.offset as i64);

        let rows = builder
            .build_query_as::<ParsingErrorRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        let errors = rows
            .into_iter()
            .map(ParsingErrorRow::into_entity)
            .collect::<DomainResult<Vec<_>>>()?;
        Ok((errors, total as u64))
    }

    async fn mark_processed(&self, id: i64) -> DomainResult<ParsingError> {
        let result = query("UPDATE parsing_errors SET is_processed = 1, processed_at = ? WHERE id = ?")
            .bind(now_timestamp())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::EntityNotFound("ParsingError".to_string(), id));
        }
        self.find_by_id(id).await
    }

    async fn stats(&self) -> DomainResult<ParsingErrorStats> {
        let stats = query_as::<_, ParserErrorTypeStats>(&format!(
            "SELECT parser_name, error_type, COUNT(*) AS total_errors, {} AS unprocessed_errors
             FROM parsing_errors GROUP BY parser_name, error_type
             ORDER BY total_errors DESC, parser_name, error_type",
            UNPROCESSED_SUM
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        let error_type_stats = query_as::<_, ErrorTypeStats>(&format!(
            "SELECT error_type, COUNT(*) AS count, {} AS unprocessed
             FROM parsing_errors GROUP BY error_type ORDER BY error_type",
            UNPROCESSED_SUM
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        let parser_stats = query_as::<_, ParserStats>(&format!(
            "SELECT parser_name, COUNT(*) AS count, {} AS unprocessed
             FROM parsing_errors GROUP BY parser_name ORDER BY parser_name",
            UNPROCESSED_SUM
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        let total_unprocessed: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM parsing_errors WHERE is_processed = 0")
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(ParsingErrorStats {
            stats,
            error_type_stats,
            parser_stats,
            total_unprocessed,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::test_support::migrated_pool;
    use serde_json::json;

    pub(crate) fn report(parser: &str, error_type: ErrorType, car_data: Option<serde_json::Value>) -> NewParsingError {
        NewParsingError {
            parser_name: parser.to_string(),
            url: format!("https://{}.example/listing", parser),
            error_type,
            error_name: Some("Error".to_string()),
            error_message: Some("selector not found".to_string()),
            error_stack: None,
            car_data,
            context: Some(json!({"attempt": 1})),
        }
    }

    pub(crate) async fn seeded_repo() -> SqliteParsingErrorRepository {
        let repo = SqliteParsingErrorRepository::new(migrated_pool().await);
        repo.insert(report("dubizzle", ErrorType::Parsing, Some(json!({"make": "Kia"})))).await.unwrap();
        repo.insert(report("dubizzle", ErrorType::Network, None)).await.unwrap();
        repo.insert(report("Dubizzle", ErrorType::Parsing, None)).await.unwrap();
        repo.insert(report("autotrader", ErrorType::Browser, Some(json!({"year": "2020"})))).await.unwrap();
        repo
    }

    #[tokio::test]
    async fn test_filters_and_newest_first() {
        let repo = seeded_repo().await;
        let params = PaginationParams { limit: 20, offset: 0 };

        let (all, total) = repo.find_all(&ParsingErrorCriteria::default(), params).await.unwrap();
        assert_eq!(total, 4);
        assert_eq!(all[0].id, 4);

        let dubizzle = ParsingErrorCriteria { parser_name: Some("DUBIZZLE".to_string()), ..Default::default() };
        assert_eq!(repo.find_all(&dubizzle, params).await.unwrap().1, 3);

        let partial = ParsingErrorCriteria { with_car_data: true, ..Default::default() };
        let (rows, total) = repo.find_all(&partial, params).await.unwrap();
        assert_eq!(total, 2);
        assert!(rows.iter().all(|e| e.car_data.is_some()));

        let parsing = ParsingErrorCriteria { error_type: Some(ErrorType::Parsing), ..Default::default() };
        let (_, total) = repo.find_all(&parsing, PaginationParams { limit: 1, offset: 1 }).await.unwrap();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn test_mark_processed() {
        let repo = seeded_repo().await;
        let processed = repo.mark_processed(2).await.unwrap();
        assert!(processed.is_processed);
        assert!(processed.processed_at.is_some());

        let open = ParsingErrorCriteria { is_processed: Some(false), ..Default::default() };
        let (_, total) = repo.find_all(&open, PaginationParams { limit: 20, offset: 0 }).await.unwrap();
        assert_eq!(total, 3);

        assert!(matches!(repo.mark_processed(99).await, Err(DomainError::EntityNotFound(_, 99))));
    }

    #[tokio::test]
    async fn test_stats_groups() {
        let repo = seeded_repo().await;
        repo.mark_processed(1).await.unwrap();

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.total_unprocessed, 3);
        assert_eq!(stats.stats.len(), 4);
        assert_eq!(
            stats.error_type_stats[2],
            ErrorTypeStats { error_type: "parsing".to_string(), count: 2, unprocessed: 1 }
        );
        assert_eq!(
            stats.parser_stats.iter().find(|p| p.parser_name == "dubizzle").map(|p| p.count),
            Some(2)
        );
    }
}
