use crate::auth::AuthContext;
use crate::domains::export::fields::resolve_fields;
use crate::domains::export::filter::ExportFilter;
use crate::domains::export::repository::ExportRepository;
use crate::domains::export::shaper::{shape_cars, shape_users};
use crate::domains::export::types::{
    ExportFormat, ExportKind, ExportRequest, ExportResult, PreviewResponse,
};
use crate::domains::export::writers::writer_for;
use crate::domains::history::types::{EntityType, HistoryAction, NewHistoryEntry};
use crate::domains::history::HistoryService;
use crate::errors::{ServiceError, ServiceResult};
use crate::types::{Permission, RequestMeta};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_MAX_RECORDS: usize = 100_000;
pub const EXPORT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// `<kind>_export_<YYYY-MM-DD>.<ext>`
pub fn export_filename(kind: ExportKind, format: ExportFormat, date: NaiveDate) -> String {
    format!(
        "{}_export_{}.{}",
        kind.as_str(),
        date.format("%Y-%m-%d"),
        format.file_extension()
    )
}

/// Runs exports and previews end to end
pub struct ExportService {
    repo: Arc<dyn ExportRepository>,
    history: Arc<HistoryService>,
    max_records: usize,
    timeout: Duration,
}

impl ExportService {
    pub fn new(repo: Arc<dyn ExportRepository>, history: Arc<HistoryService>, max_records: usize) -> Self {
        Self {
            repo,
            history,
            max_records,
            timeout: EXPORT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Export every record of `F::KIND` matching the request filters.
    ///
    /// Fails with `PayloadTooLarge` when more than `max_records` rows match.
    /// Any other failure after the time ceiling is reported as `Timeout`.
    pub async fn export<F: ExportFilter>(
        &self,
        request: ExportRequest<F>,
        auth: &AuthContext,
        meta: &RequestMeta,
    ) -> ServiceResult<ExportResult> {
        auth.authorize(Permission::ExportData)?;

        let started = Instant::now();
        let format = request.format;
        let result = match self.build::<F>(request).await {
            Ok(result) => result,
            Err(err) => return Err(self.escalate(err, started.elapsed())),
        };

        log::info!(
            "Exported {} {} records as {} in {} ms",
            result.record_count,
            F::KIND.as_str(),
            format.as_str(),
            started.elapsed().as_millis()
        );

        let entry = NewHistoryEntry {
            entity_type: EntityType::Export,
            entity_id: 0,
            action: HistoryAction::Export,
            changes: None,
            description: Some(format!(
                "Экспорт {}: {} записей, формат: {}",
                F::KIND.audit_noun(),
                result.record_count,
                format.as_str()
            )),
        };
        if let Err(e) = self.history.record(entry, auth, meta).await {
            log::error!("Failed to record {} export in history: {}", F::KIND.as_str(), e);
        }

        Ok(result)
    }

    async fn build<F: ExportFilter>(&self, request: ExportRequest<F>) -> ServiceResult<ExportResult> {
        let kind = F::KIND;
        let fields = resolve_fields(kind, request.fields.as_deref())?;
        let filters = request.filters.unwrap_or_default().compact();
        let predicate = filters.to_predicate()?;

        let total = self.repo.count(kind, &predicate).await? as usize;
        if total > self.max_records {
            return Err(ServiceError::PayloadTooLarge {
                limit: self.max_records,
                actual: total,
            });
        }

        let records = match kind {
            ExportKind::Cars => {
                let rows = self.repo.fetch_cars(&predicate).await?;
                shape_cars(&rows, &fields, self.repo.as_ref()).await?
            }
            ExportKind::Users => {
                let rows = self.repo.fetch_users(&predicate).await?;
                shape_users(&rows, &fields)
            }
        };

        let bytes = writer_for(request.format).write(&fields, &records)?;

        Ok(ExportResult {
            bytes,
            content_type: request.format.content_type(),
            filename: export_filename(kind, request.format, Utc::now().date_naive()),
            record_count: records.len(),
        })
    }

    /// A failure that lands past the ceiling becomes `Timeout`; the size guard always wins
    fn escalate(&self, err: ServiceError, elapsed: Duration) -> ServiceError {
        match err {
            ServiceError::PayloadTooLarge { .. } => err,
            _ if elapsed > self.timeout => {
                log::error!("Export failed after {} ms: {}", elapsed.as_millis(), err);
                ServiceError::Timeout
            }
            _ => err,
        }
    }

    /// Count what an export with `filters` would contain
    pub async fn preview<F: ExportFilter>(&self, filters: F, auth: &AuthContext) -> ServiceResult<PreviewResponse> {
        auth.authorize(Permission::ExportData)?;

        let filters = filters.compact();
        let predicate = filters.to_predicate()?;
        let count = self.repo.count(F::KIND, &predicate).await?;

        Ok(PreviewResponse {
            count,
            kind: F::KIND,
            filters_applied: filters.applied(),
        })
    }
}
