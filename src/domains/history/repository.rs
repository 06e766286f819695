use crate::domains::history::types::{
    DateCount, EntityType, HistoryAction, HistoryEntry, HistoryRecord, HistoryRow,
    HistorySortField, HistoryStats, SortOrder, StatsPeriod, UserActivity,
};
use crate::errors::{DbError, DomainError, DomainResult};
use crate::types::{now_timestamp, PaginationParams};
use crate::validation::escape_like;
use async_trait::async_trait;
use sqlx::{query, query_as, QueryBuilder, Sqlite, SqlitePool};
use std::collections::BTreeMap;

/// Resolved constraints shared by listing and statistics queries.
/// Date bounds are already normalized to stored timestamp strings.
#[derive(Debug, Clone, Default)]
pub struct HistoryCriteria {
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<i64>,
    pub action: Option<HistoryAction>,
    pub user_id: Option<i64>,
    pub created_from: Option<String>,
    pub created_to: Option<String>,
    pub search: Option<String>,
}

impl HistoryCriteria {
    fn push_where(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        builder.push(" WHERE 1 = 1");
        if let Some(entity_type) = self.entity_type {
            builder.push(" AND entity_type = ").push_bind(entity_type.as_str());
        }
        if let Some(entity_id) = self.entity_id {
            builder.push(" AND entity_id = ").push_bind(entity_id);
        }
        if let Some(action) = self.action {
            builder.push(" AND action = ").push_bind(action.as_str());
        }
        if let Some(user_id) = self.user_id {
            builder.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(from) = &self.created_from {
            builder.push(" AND created_at >= ").push_bind(from.clone());
        }
        if let Some(to) = &self.created_to {
            builder.push(" AND created_at <= ").push_bind(to.clone());
        }
        if let Some(search) = &self.search {
            builder
                .push(" AND LOWER(description) LIKE LOWER(")
                .push_bind(format!("%{}%", escape_like(search)))
                .push(") ESCAPE '\\'");
        }
    }
}

/// History repository trait
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    async fn insert(&self, record: HistoryRecord) -> DomainResult<HistoryEntry>;

    async fn find_by_id(&self, id: i64) -> DomainResult<HistoryEntry>;

    async fn find_all(
        &self,
        criteria: &HistoryCriteria,
        sort_by: HistorySortField,
        sort_order: SortOrder,
        params: PaginationParams,
    ) -> DomainResult<(Vec<HistoryEntry>, u64)>;

    /// Entries for one entity, newest first
    async fn find_by_entity(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        action: Option<HistoryAction>,
        params: PaginationParams,
    ) -> DomainResult<(Vec<HistoryEntry>, u64)>;

    async fn delete(&self, id: i64) -> DomainResult<()>;

    async fn stats(&self, criteria: &HistoryCriteria) -> DomainResult<HistoryStats>;
}

pub struct SqliteHistoryRepository {
    pool: SqlitePool,
}

impl SqliteHistoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn map_rows(rows: Vec<HistoryRow>) -> DomainResult<Vec<HistoryEntry>> {
        rows.into_iter().map(HistoryRow::into_entity).collect()
    }

    async fn count(&self, criteria: &HistoryCriteria) -> DomainResult<i64> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM history");
        criteria.push_where(&mut builder);
        builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))
    }

    async fn grouped_counts(&self, column: &str, criteria: &HistoryCriteria) -> DomainResult<BTreeMap<String, i64>> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {}, COUNT(*) FROM history", column));
        criteria.push_where(&mut builder);
        builder.push(format!(" GROUP BY {}", column));

        let rows: Vec<(String, i64)> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(rows.into_iter().collect())
    }
}

#[async_trait]
impl HistoryRepository for SqliteHistoryRepository {
    async fn insert(&self, record: HistoryRecord) -> DomainResult<HistoryEntry> {
        let changes = record
            .changes
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| DomainError::Serialization(e.to_string()))?;

        let result = query(
            "INSERT INTO history (entity_type, entity_id, action, changes, user_id, user_name, description, ip_address, user_agent, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(record.entity_type.as_str())
        .bind(record.entity_id)
        .bind(record.action.as_str())
        .bind(changes)
        .bind(record.user_id)
        .bind(&record.user_name)
        .bind(&record.description)
        .bind(&record.ip_address)
        .bind(&record.user_agent)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        self.find_by_id(result.last_insert_rowid()).await
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<HistoryEntry> {
        query_as::<_, HistoryRow>("SELECT * FROM history WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| DomainError::EntityNotFound("History".to_string(), id))?
            .into_entity()
    }

    async fn find_all(
        &self,
        criteria: &HistoryCriteria,
        sort_by: HistorySortField,
        sort_order: SortOrder,
        params: PaginationParams,
    ) -> DomainResult<(Vec<HistoryEntry>, u64)> {
        let total = self.count(criteria).await?;

        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM history");
        criteria.push_where(&mut builder);
        builder.push(format!(" ORDER BY {} {}, id {}", sort_by.column(), sort_order.as_sql(), sort_order.as_sql()));
        builder.push(" LIMIT ").push_bind(params.limit as i64);
        builder.push(" OFFSET ").push_bind(params.offset as i64);

        let rows = builder
            .build_query_as::<HistoryRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok((Self::map_rows(rows)?, total as u64))
    }

    async fn find_by_entity(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        action: Option<HistoryAction>,
        params: PaginationParams,
    ) -> DomainResult<(Vec<HistoryEntry>, u64)> {
        let criteria = HistoryCriteria {
            entity_type: Some(entity_type),
            entity_id: Some(entity_id),
            action,
            ..Default::default()
        };
        self.find_all(&criteria, HistorySortField::CreatedAt, SortOrder::Desc, params).await
    }

    async fn delete(&self, id: i64) -> DomainResult<()> {
        let result = query("DELETE FROM history WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::EntityNotFound("History".to_string(), id));
        }
        Ok(())
    }

    async fn stats(&self, criteria: &HistoryCriteria) -> DomainResult<HistoryStats> {
        let total_actions = self.count(criteria).await?;
        let by_action = self.grouped_counts("action", criteria).await?;
        let by_entity_type = self.grouped_counts("entity_type", criteria).await?;

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT user_id, MAX(user_name) AS user_name, COUNT(*) AS count FROM history",
        );
        criteria.push_where(&mut builder);
        builder.push(" GROUP BY user_id ORDER BY count DESC, user_id ASC LIMIT 10");
        let by_user = builder
            .build_query_as::<UserActivity>()
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT substr(created_at, 1, 10) AS date, COUNT(*) AS count FROM history",
        );
        criteria.push_where(&mut builder);
        builder.push(" GROUP BY date ORDER BY date DESC LIMIT 30");
        let by_date = builder
            .build_query_as::<DateCount>()
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(HistoryStats {
            total_actions,
            by_action,
            by_entity_type,
            by_user,
            by_date,
            period: StatsPeriod {
                from: criteria.created_from.clone(),
                to: criteria.created_to.clone(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::migrated_pool;

    fn record(entity_type: EntityType, entity_id: i64, action: HistoryAction, user_id: i64, description: &str) -> HistoryRecord {
        HistoryRecord {
            entity_type,
            entity_id,
            action,
            changes: None,
            user_id,
            user_name: Some(format!("user {}", user_id)),
            description: Some(description.to_string()),
            ip_address: None,
            user_agent: None,
        }
    }

    async fn seeded() -> SqliteHistoryRepository {
        let repo = SqliteHistoryRepository::new(migrated_pool().await);
        repo.insert(record(EntityType::Car, 1, HistoryAction::Create, 1, "Created Toyota")).await.unwrap();
        repo.insert(record(EntityType::Car, 1, HistoryAction::Update, 2, "Price 50% off")).await.unwrap();
        repo.insert(record(EntityType::User, 7, HistoryAction::Create, 1, "Created user")).await.unwrap();
        repo.insert(record(EntityType::Export, 0, HistoryAction::Export, 2, "Exported 3 cars to csv")).await.unwrap();
        repo
    }

    #[tokio::test]
    async fn test_filters_and_pagination() {
        let repo = seeded().await;
        let params = PaginationParams { limit: 2, offset: 0 };

        let (all, total) = repo
            .find_all(&HistoryCriteria::default(), HistorySortField::CreatedAt, SortOrder::Desc, params)
            .await
            .unwrap();
        assert_eq!(total, 4);
        assert_eq!(all.len(), 2);

        let cars = HistoryCriteria { entity_type: Some(EntityType::Car), ..Default::default() };
        let (_, total) = repo
            .find_all(&cars, HistorySortField::CreatedAt, SortOrder::Desc, params)
            .await
            .unwrap();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn test_search_treats_percent_literally() {
        let repo = seeded().await;
        let criteria = HistoryCriteria { search: Some("50%".to_string()), ..Default::default() };
        let (rows, total) = repo
            .find_all(&criteria, HistorySortField::CreatedAt, SortOrder::Asc, PaginationParams { limit: 50, offset: 0 })
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].action, HistoryAction::Update);
    }

    #[tokio::test]
    async fn test_find_by_entity_newest_first() {
        let repo = seeded().await;
        let (rows, total) = repo
            .find_by_entity(EntityType::Car, 1, None, PaginationParams { limit: 50, offset: 0 })
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(rows[0].action, HistoryAction::Update);
        assert_eq!(rows[1].action, HistoryAction::Create);
    }

    #[tokio::test]
    async fn test_stats_groups() {
        let repo = seeded().await;
        let stats = repo.stats(&HistoryCriteria::default()).await.unwrap();
        assert_eq!(stats.total_actions, 4);
        assert_eq!(stats.by_action["create"], 2);
        assert_eq!(stats.by_entity_type["car"], 2);
        assert_eq!(stats.by_user.len(), 2);
        assert_eq!(stats.by_user[0].count, 2);
        assert_eq!(stats.by_date.len(), 1);
        assert_eq!(stats.by_date[0].count, 4);
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = seeded().await;
        repo.delete(1).await.unwrap();
        assert!(matches!(repo.find_by_id(1).await, Err(DomainError::EntityNotFound(_, 1))));
        assert!(repo.delete(1).await.is_err());
    }
}
