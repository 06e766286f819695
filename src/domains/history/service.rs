use crate::auth::AuthContext;
use crate::domains::history::repository::{HistoryCriteria, HistoryRepository};
use crate::domains::history::types::{
    EntityHistoryQuery, EntityType, HistoryEntry, HistoryFilter, HistoryRecord, HistorySortField,
    HistoryStats, HistoryStatsFilter, NewHistoryEntry, SortOrder, DEFAULT_LIMIT, MAX_LIMIT,
};
use crate::errors::{DomainResult, ServiceResult};
use crate::types::{format_timestamp, PaginatedResult, PaginationParams, Permission, RequestMeta};
use crate::validation::{ensure_ordered, non_blank, parse_date_bound, DateBound, Validate, ValidationBuilder};
use std::sync::Arc;

/// Audit log operations
pub struct HistoryService {
    repo: Arc<dyn HistoryRepository>,
}

impl HistoryService {
    pub fn new(repo: Arc<dyn HistoryRepository>) -> Self {
        Self { repo }
    }

    /// Append an entry on behalf of a client
    pub async fn create(
        &self,
        entry: NewHistoryEntry,
        auth: &AuthContext,
        meta: &RequestMeta,
    ) -> ServiceResult<HistoryEntry> {
        auth.authorize(Permission::RecordHistory)?;
        entry.validate()?;
        self.record(entry, auth, meta).await
    }

    /// Append an entry produced by another service; no permission check
    pub async fn record(
        &self,
        entry: NewHistoryEntry,
        auth: &AuthContext,
        meta: &RequestMeta,
    ) -> ServiceResult<HistoryEntry> {
        let record = HistoryRecord {
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            action: entry.action,
            changes: entry.changes,
            user_id: auth.user_id,
            user_name: Some(auth.display_name.clone()),
            description: entry.description,
            ip_address: meta.ip_address.clone(),
            user_agent: meta.user_agent.clone(),
        };
        Ok(self.repo.insert(record).await?)
    }

    pub async fn list(
        &self,
        filter: HistoryFilter,
        auth: &AuthContext,
    ) -> ServiceResult<PaginatedResult<HistoryEntry>> {
        auth.authorize(Permission::ViewHistory)?;

        let limit = resolve_limit(filter.limit)?;
        let sort_by = match non_blank(&filter.sort_by) {
            Some(field) => HistorySortField::parse(field)?,
            None => HistorySortField::CreatedAt,
        };
        let sort_order = match non_blank(&filter.sort_order) {
            Some(order) => SortOrder::parse(order)?,
            None => SortOrder::Desc,
        };

        let (created_from, created_to) = resolve_period(&filter.date_from, &filter.date_to)?;
        let criteria = HistoryCriteria {
            entity_type: filter.entity_type,
            entity_id: filter.entity_id,
            action: filter.action,
            user_id: filter.user_id,
            created_from,
            created_to,
            search: non_blank(&filter.search).map(str::to_string),
        };

        let params = PaginationParams::resolve(limit, filter.offset, filter.page);
        let (entries, total) = self.repo.find_all(&criteria, sort_by, sort_order, params).await?;

        Ok(match filter.page.filter(|p| *p > 0) {
            Some(page) => PaginatedResult::with_page(entries, total, params, page),
            None => PaginatedResult::new(entries, total, params),
        })
    }

    pub async fn get(&self, id: i64, auth: &AuthContext) -> ServiceResult<HistoryEntry> {
        auth.authorize(Permission::ViewHistory)?;
        Ok(self.repo.find_by_id(id).await?)
    }

    pub async fn list_for_entity(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        query: EntityHistoryQuery,
        auth: &AuthContext,
    ) -> ServiceResult<PaginatedResult<HistoryEntry>> {
        auth.authorize(Permission::ViewHistory)?;

        let params = PaginationParams::resolve(resolve_limit(query.limit)?, query.offset, None);
        let (entries, total) = self
            .repo
            .find_by_entity(entity_type, entity_id, query.action, params)
            .await?;

        Ok(PaginatedResult::new(entries, total, params))
    }

    pub async fn stats(&self, filter: HistoryStatsFilter, auth: &AuthContext) -> ServiceResult<HistoryStats> {
        auth.authorize(Permission::ViewHistory)?;

        let (created_from, created_to) = resolve_period(&filter.date_from, &filter.date_to)?;
        let criteria = HistoryCriteria {
            entity_type: filter.entity_type,
            user_id: filter.user_id,
            created_from,
            created_to,
            ..Default::default()
        };

        Ok(self.repo.stats(&criteria).await?)
    }

    pub async fn delete(&self, id: i64, auth: &AuthContext) -> ServiceResult<()> {
        auth.authorize(Permission::DeleteHistory)?;
        self.repo.delete(id).await?;
        log::info!("History entry {} deleted by user {}", id, auth.user_id);
        Ok(())
    }
}

fn resolve_limit(limit: Option<u32>) -> DomainResult<u32> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    ValidationBuilder::new("limit", Some(limit))
        .range(1, MAX_LIMIT)
        .validate()?;
    Ok(limit)
}

pub(crate) fn resolve_period(
    date_from: &Option<String>,
    date_to: &Option<String>,
) -> DomainResult<(Option<String>, Option<String>)> {
    let from = non_blank(date_from)
        .map(|v| parse_date_bound(v, "date_from", DateBound::Start))
        .transpose()?;
    let to = non_blank(date_to)
        .map(|v| parse_date_bound(v, "date_to", DateBound::End))
        .transpose()?;
    ensure_ordered(from.as_ref(), to.as_ref(), "date_from", "date_to")?;

    Ok((from.as_ref().map(format_timestamp), to.as_ref().map(format_timestamp)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::history::repository::SqliteHistoryRepository;
    use crate::domains::history::types::HistoryAction;
    use crate::errors::{DomainError, ServiceError, ValidationError};
    use crate::test_support::migrated_pool;
    use crate::types::UserRole;

    fn ctx(role: UserRole) -> AuthContext {
        AuthContext::new(1, "boss@example.com".to_string(), "Boss".to_string(), role)
    }

    async fn service() -> HistoryService {
        HistoryService::new(Arc::new(SqliteHistoryRepository::new(migrated_pool().await)))
    }

    fn entry(entity_id: i64) -> NewHistoryEntry {
        NewHistoryEntry {
            entity_type: EntityType::Car,
            entity_id,
            action: HistoryAction::Update,
            changes: None,
            description: Some("Changed price".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_attributes_caller() {
        let service = service().await;
        let meta = RequestMeta {
            ip_address: Some("10.0.0.1".to_string()),
            user_agent: Some("curl/8".to_string()),
        };
        let created = service.create(entry(3), &ctx(UserRole::User), &meta).await.unwrap();
        assert_eq!(created.user_id, 1);
        assert_eq!(created.user_name.as_deref(), Some("Boss"));
        assert_eq!(created.ip_address.as_deref(), Some("10.0.0.1"));
    }

    #[tokio::test]
    async fn test_list_pagination_and_sorting() {
        let service = service().await;
        let admin = ctx(UserRole::Admin);
        for id in 1..=5 {
            service.record(entry(id), &admin, &RequestMeta::default()).await.unwrap();
        }

        let page = service
            .list(HistoryFilter { limit: Some(2), page: Some(2), ..Default::default() }, &admin)
            .await
            .unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.pagination.total, 5);
        assert_eq!(page.pagination.offset, 2);
        assert_eq!(page.pagination.page, 2);
        assert_eq!(page.pagination.total_pages, 3);

        let err = service
            .list(HistoryFilter { sort_by: Some("description".to_string()), ..Default::default() }, &admin)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_inverted_period_rejected() {
        let service = service().await;
        let err = service
            .stats(
                HistoryStatsFilter {
                    date_from: Some("2024-02-01".to_string()),
                    date_to: Some("2024-01-01".to_string()),
                    ..Default::default()
                },
                &ctx(UserRole::Manager),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::Validation(ValidationError::InvertedRange { .. }))
        ));
    }

    #[tokio::test]
    async fn test_stats_period_reports_widened_bounds() {
        let service = service().await;
        let stats = service
            .stats(
                HistoryStatsFilter {
                    date_from: Some("2024-01-01".to_string()),
                    date_to: Some("2024-01-31".to_string()),
                    ..Default::default()
                },
                &ctx(UserRole::Manager),
            )
            .await
            .unwrap();
        assert_eq!(stats.total_actions, 0);
        assert_eq!(stats.period.to.as_deref(), Some("2024-01-31T23:59:59.999Z"));
    }

    #[tokio::test]
    async fn test_delete_requires_admin() {
        let service = service().await;
        let admin = ctx(UserRole::Admin);
        let created = service.record(entry(1), &admin, &RequestMeta::default()).await.unwrap();

        assert!(matches!(
            service.delete(created.id, &ctx(UserRole::Manager)).await,
            Err(ServiceError::PermissionDenied(_))
        ));
        service.delete(created.id, &admin).await.unwrap();
    }
}
