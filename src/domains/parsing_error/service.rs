use crate::auth::AuthContext;
use crate::domains::history::service::resolve_period;
use crate::domains::parsing_error::repository::{ParsingErrorCriteria, ParsingErrorRepository};
use crate::domains::parsing_error::types::{
    BulkProcessResult, NewParsingError, ParsingError, ParsingErrorFilter, ParsingErrorStats, DEFAULT_LIMIT,
    MAX_LIMIT,
};
use crate::errors::{DomainResult, ServiceResult};
use crate::types::{PaginatedResult, PaginationParams, Permission};
use crate::validation::{non_blank, Validate, ValidationBuilder};
use std::sync::Arc;

/// Review queue for scraper failures
pub struct ParsingErrorService {
    repo: Arc<dyn ParsingErrorRepository>,
}

impl ParsingErrorService {
    pub fn new(repo: Arc<dyn ParsingErrorRepository>) -> Self {
        Self { repo }
    }

    /// Store a failure reported by a parser; no permission check
    pub async fn record(&self, report: NewParsingError) -> ServiceResult<ParsingError> {
        report.validate()?;
        let stored = self.repo.insert(report).await?;
        log::debug!("Parsing error {} recorded for {}", stored.id, stored.parser_name);
        Ok(stored)
    }

    pub async fn list(
        &self,
        filter: ParsingErrorFilter,
        auth: &AuthContext,
    ) -> ServiceResult<PaginatedResult<ParsingError>> {
        auth.authorize(Permission::ManageParsingErrors)?;
        self.page(filter, false).await
    }

    /// Errors that still carry partially extracted listing data
    pub async fn partial_data(
        &self,
        filter: ParsingErrorFilter,
        auth: &AuthContext,
    ) -> ServiceResult<PaginatedResult<ParsingError>> {
        auth.authorize(Permission::ManageParsingErrors)?;
        self.page(filter, true).await
    }

    pub async fn get(&self, id: i64, auth: &AuthContext) -> ServiceResult<ParsingError> {
        auth.authorize(Permission::ManageParsingErrors)?;
        Ok(self.repo.find_by_id(id).await?)
    }

    pub async fn mark_processed(&self, id: i64, auth: &AuthContext) -> ServiceResult<ParsingError> {
        auth.authorize(Permission::ManageParsingErrors)?;
        let processed = self.repo.mark_processed(id).await?;
        log::info!("Parsing error {} processed by user {}", id, auth.user_id);
        Ok(processed)
    }

    /// Mark each id in turn; ids that fail are reported instead of aborting the batch
    pub async fn mark_many_processed(&self, ids: &[i64], auth: &AuthContext) -> ServiceResult<BulkProcessResult> {
        auth.authorize(Permission::ManageParsingErrors)?;

        let mut result = BulkProcessResult { processed: 0, failed: Vec::new() };
        for &id in ids {
            match self.repo.mark_processed(id).await {
                Ok(_) => result.processed += 1,
                Err(e) => {
                    log::warn!("Failed to mark parsing error {} as processed: {}", id, e);
                    result.failed.push(id);
                }
            }
        }
        log::info!(
            "User {} processed {} of {} parsing errors",
            auth.user_id,
            result.processed,
            ids.len()
        );
        Ok(result)
    }

    pub async fn stats(&self, auth: &AuthContext) -> ServiceResult<ParsingErrorStats> {
        auth.authorize(Permission::ManageParsingErrors)?;
        Ok(self.repo.stats().await?)
    }

    async fn page(&self, filter: ParsingErrorFilter, with_car_data: bool) -> ServiceResult<PaginatedResult<ParsingError>> {
        let limit = resolve_limit(filter.limit)?;
        let (created_from, created_to) = resolve_period(&filter.date_from, &filter.date_to)?;
        let criteria = ParsingErrorCriteria {
            parser_name: non_blank(&filter.parser_name).map(str::to_string),
            error_type: filter.error_type,
            is_processed: filter.is_processed,
            created_from,
            created_to,
            with_car_data,
        };

        let page = filter.page.filter(|p| *p > 0).unwrap_or(1);
        let params = PaginationParams::resolve(limit, None, Some(page));
        let (errors, total) = self.repo.find_all(&criteria, params).await?;
        Ok(PaginatedResult::with_page(errors, total, params, page))
    }
}

fn resolve_limit(limit: Option<u32>) -> DomainResult<u32> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    ValidationBuilder::new("limit", Some(limit))
        .range(1, MAX_LIMIT)
        .validate()?;
    Ok(limit)
}
