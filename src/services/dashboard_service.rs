// src/services/dashboard_service.rs

use std::{sync::Arc, time::Duration};

use crate::{
    common::{cache::TtlCache, error::AppError},
    db::TicketSource,
    models::dashboard::{
        DateRange, PaymentMethodRevenue, PeriodSummary, SalesChartEntry, TicketFilter, TicketRecord,
    },
    services::aggregation,
};

pub type TicketCache = TtlCache<Arc<Vec<TicketRecord>>>;

#[derive(Clone)]
pub struct DashboardService {
    source: Arc<dyn TicketSource>,
    cache: Arc<TicketCache>,
}

// A chave só depende do que a fonte recebe (o intervalo). Os demais filtros
// são aplicados em memória sobre o resultado cacheado.
fn cache_key(range: Option<&DateRange>) -> String {
    match range {
        Some(r) => format!("tickets:{}..{}", r.start.to_rfc3339(), r.end.to_rfc3339()),
        None => "tickets:all".to_string(),
    }
}

impl DashboardService {
    pub fn new(source: Arc<dyn TicketSource>, cache: Arc<TicketCache>) -> Self {
        Self { source, cache }
    }

    /// Atalho para montar o serviço com um cache novo.
    pub fn with_default_cache(source: Arc<dyn TicketSource>, default_ttl: Option<Duration>) -> Self {
        Self::new(source, Arc::new(TtlCache::new(default_ttl)))
    }

    pub fn cache(&self) -> &Arc<TicketCache> {
        &self.cache
    }

    pub async fn fetch_records(&self, range: Option<&DateRange>) -> Result<Arc<Vec<TicketRecord>>, AppError> {
        let key = cache_key(range);

        if let Some(records) = self.cache.get(&key) {
            tracing::debug!("Cache hit: {}", key);
            return Ok(records);
        }

        let records = Arc::new(self.source.fetch_records(range).await?);
        tracing::debug!("Cache miss: {} ({} comandas carregadas)", key, records.len());
        self.cache.set(key, Arc::clone(&records), None);

        Ok(records)
    }

    // Força a próxima leitura a ir até a fonte.
    pub fn invalidate(&self) {
        self.cache.clear();
    }

    pub async fn get_summary(&self, filter: &TicketFilter) -> Result<PeriodSummary, AppError> {
        let records = self.fetch_records(filter.date_range.as_ref()).await?;
        Ok(aggregation::aggregate(&records, filter))
    }

    pub async fn get_sales_chart(&self, filter: &TicketFilter) -> Result<Vec<SalesChartEntry>, AppError> {
        let records = self.fetch_records(filter.date_range.as_ref()).await?;
        Ok(aggregation::daily_sales(&records, filter))
    }

    pub async fn get_payment_breakdown(&self, filter: &TicketFilter) -> Result<Vec<PaymentMethodRevenue>, AppError> {
        let records = self.fetch_records(filter.date_range.as_ref()).await?;
        Ok(aggregation::revenue_by_payment_method(&records, filter))
    }

    pub async fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<TicketRecord>, AppError> {
        let records = self.fetch_records(filter.date_range.as_ref()).await?;
        Ok(aggregation::filter_records(&records, filter).into_iter().cloned().collect())
    }
}
