// src/models/dashboard.rs

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_method", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    Card,
    Cash,
    MobileTransfer, // Vira "mobile-transfer"
    Other,
}

// --- Registro transacional (a comanda fechada) ---
// Imutável depois de produzido: esta camada só lê.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[schema(example = 4)]
    pub party_size: i32,
    #[schema(example = "182.40")]
    pub total_amount: Decimal,
    pub payment_method: PaymentMethod,
    #[schema(example = "18.00")]
    pub tip: Decimal,
    #[schema(example = "0.00")]
    pub discount: Decimal,
    #[schema(example = 55)]
    pub duration_minutes: i32,
    #[schema(example = "Aniversário na mesa 12")]
    pub notes: Option<String>,
}

// --- Filtros ---

// Intervalo fechado dos dois lados: start <= timestamp <= end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        self.start <= *timestamp && *timestamp <= self.end
    }
}

/// Critérios opcionais, aplicados em conjunção (AND). `None` = sem restrição.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketFilter {
    pub date_range: Option<DateRange>,
    pub payment_method: Option<PaymentMethod>,
    // `Some(true)` restringe a tip > 0; `Some(false)` não restringe nada.
    pub has_tip: Option<bool>,
    pub has_discount: Option<bool>,
    pub text_search: Option<String>,
}

impl TicketFilter {
    pub fn matches(&self, record: &TicketRecord) -> bool {
        if let Some(range) = &self.date_range {
            if !range.contains(&record.timestamp) {
                return false;
            }
        }

        if let Some(method) = self.payment_method {
            if record.payment_method != method {
                return false;
            }
        }

        if self.has_tip == Some(true) && record.tip <= Decimal::ZERO {
            return false;
        }

        if self.has_discount == Some(true) && record.discount <= Decimal::ZERO {
            return false;
        }

        if let Some(needle) = &self.text_search {
            let needle = needle.to_lowercase();
            let found = record
                .notes
                .as_deref()
                .is_some_and(|notes| notes.to_lowercase().contains(&needle));
            if !found {
                return false;
            }
        }

        true
    }
}

// --- Resultados derivados (nunca persistidos) ---

// 1. Resumo do período (os cards do topo)
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSummary {
    pub count: u32,
    pub total_amount: Decimal,
    pub total_tips: Decimal,
    pub total_discounts: Decimal,
    pub average_ticket: Decimal,
    pub average_party_size: Decimal,
    pub average_duration: Decimal,
    pub average_tip: Decimal,
    // Só aparecem os métodos presentes no subconjunto filtrado.
    #[schema(value_type = Object, example = json!({"card": 12, "cash": 3}))]
    pub payment_method_distribution: BTreeMap<PaymentMethod, u32>,
}

// 2. Gráfico de vendas por dia
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalesChartEntry {
    #[schema(value_type = String, format = Date, example = "2025-03-14")]
    pub date: NaiveDate,
    pub total: Decimal,
    pub count: u32,
}

// 3. Faturamento por forma de pagamento
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodRevenue {
    pub payment_method: PaymentMethod,
    pub total: Decimal,
    pub count: u32,
}
