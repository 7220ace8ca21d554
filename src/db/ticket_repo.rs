// src/db/ticket_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::dashboard::{DateRange, PaymentMethod, TicketRecord},
};

// De onde vêm as comandas. O dashboard não sabe (nem precisa saber) se são
// dados simulados ou do banco.
#[async_trait]
pub trait TicketSource: Send + Sync {
    async fn fetch_records(&self, range: Option<&DateRange>) -> Result<Vec<TicketRecord>, AppError>;
}

// =========================================================================
//  DADOS SIMULADOS
// =========================================================================

const MOCK_WINDOW_DAYS: i64 = 30;

const MOCK_NOTES: &[&str] = &[
    "Aniversário na mesa 12",
    "Cliente pediu sem glúten",
    "Jantar corporativo",
    "Reclamou da demora na sobremesa",
    "Mesa na varanda",
    "Voucher de marketing aplicado",
];

/// Gera comandas aleatórias (mas determinísticas para a mesma seed) espalhadas
/// pelos últimos 30 dias, contados a partir da criação da fonte.
#[derive(Debug, Clone)]
pub struct MockTicketSource {
    records: Vec<TicketRecord>,
}

impl MockTicketSource {
    pub fn new(count: usize, seed: u64) -> Self {
        Self::generate(count, seed, Utc::now())
    }

    pub fn generate(count: usize, seed: u64, anchor: DateTime<Utc>) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let methods = [
            PaymentMethod::Card,
            PaymentMethod::Card,
            PaymentMethod::Card,
            PaymentMethod::Cash,
            PaymentMethod::MobileTransfer,
            PaymentMethod::MobileTransfer,
            PaymentMethod::Other,
        ];

        let mut records: Vec<TicketRecord> = (0..count)
            .map(|_| {
                let minutes_back = rng.gen_range(0..MOCK_WINDOW_DAYS * 24 * 60);
                let party_size = rng.gen_range(1..=8);
                // Valores em centavos para manter duas casas decimais.
                let per_head_cents: i64 = rng.gen_range(3_500..=12_000);
                let total_amount = Decimal::new(per_head_cents * i64::from(party_size), 2);

                let tip = if rng.gen_bool(0.6) {
                    (total_amount * Decimal::new(rng.gen_range(5..=15), 2)).round_dp(2)
                } else {
                    Decimal::ZERO
                };
                let discount = if rng.gen_bool(0.2) {
                    Decimal::new(rng.gen_range(500..=3_000), 2)
                } else {
                    Decimal::ZERO
                };
                let notes = if rng.gen_bool(0.3) {
                    MOCK_NOTES.choose(&mut rng).map(|note| note.to_string())
                } else {
                    None
                };

                TicketRecord {
                    id: uuid::Builder::from_random_bytes(rng.r#gen()).into_uuid(),
                    timestamp: anchor - Duration::minutes(minutes_back),
                    party_size,
                    total_amount,
                    payment_method: *methods.choose(&mut rng).unwrap_or(&PaymentMethod::Card),
                    tip,
                    discount,
                    duration_minutes: rng.gen_range(20..=150),
                    notes,
                }
            })
            .collect();

        // Como sairia do banco: mais antigas primeiro.
        records.sort_by_key(|record| record.timestamp);

        Self { records }
    }

    #[cfg(test)]
    pub fn from_records(records: Vec<TicketRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl TicketSource for MockTicketSource {
    async fn fetch_records(&self, range: Option<&DateRange>) -> Result<Vec<TicketRecord>, AppError> {
        let records = self
            .records
            .iter()
            .filter(|record| range.is_none_or(|r| r.contains(&record.timestamp)))
            .cloned()
            .collect();

        Ok(records)
    }
}

// =========================================================================
//  POSTGRES (pass-through simples)
// =========================================================================

#[derive(Clone)]
pub struct PgTicketRepository {
    pool: PgPool,
}

impl PgTicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Os limites "abertos" (MIN_UTC/MAX_UTC) não cabem num timestamptz; viram NULL.
#[async_trait]
impl TicketSource for PgTicketRepository {
    async fn fetch_records(&self, range: Option<&DateRange>) -> Result<Vec<TicketRecord>, AppError> {
        let tickets = sqlx::query_as::<_, TicketRecord>(
            r#"
            SELECT id, closed_at AS "timestamp", party_size, total_amount,
                   payment_method, tip, discount, duration_minutes, notes
            FROM tickets
            WHERE ($1::timestamptz IS NULL OR closed_at >= $1)
              AND ($2::timestamptz IS NULL OR closed_at <= $2)
            ORDER BY closed_at ASC
            "#,
        )
            .bind(range.map(|r| r.start).filter(|start| *start != DateTime::<Utc>::MIN_UTC))
            .bind(range.map(|r| r.end).filter(|end| *end != DateTime::<Utc>::MAX_UTC))
            .fetch_all(&self.pool)
            .await?;

        Ok(tickets)
    }
}
