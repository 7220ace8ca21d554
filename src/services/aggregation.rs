// src/services/aggregation.rs

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::models::dashboard::{
    PaymentMethod, PaymentMethodRevenue, PeriodSummary, SalesChartEntry, TicketFilter, TicketRecord,
};

/// Uma única passada, ordem de entrada preservada.
pub fn filter_records<'a>(records: &'a [TicketRecord], filter: &TicketFilter) -> Vec<&'a TicketRecord> {
    records.iter().filter(|record| filter.matches(record)).collect()
}

// Média que vale 0 quando não há nada para dividir.
fn average(total: Decimal, count: u32) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    total / Decimal::from(count)
}

pub fn summarize(records: &[&TicketRecord]) -> PeriodSummary {
    let mut count: u32 = 0;
    let mut total_amount = Decimal::ZERO;
    let mut total_tips = Decimal::ZERO;
    let mut total_discounts = Decimal::ZERO;
    let mut total_party: i64 = 0;
    let mut total_duration: i64 = 0;
    let mut distribution: BTreeMap<PaymentMethod, u32> = BTreeMap::new();

    for record in records {
        count += 1;
        total_amount += record.total_amount;
        total_tips += record.tip;
        total_discounts += record.discount;
        total_party += i64::from(record.party_size);
        total_duration += i64::from(record.duration_minutes);
        *distribution.entry(record.payment_method).or_insert(0) += 1;
    }

    PeriodSummary {
        count,
        total_amount,
        total_tips,
        total_discounts,
        average_ticket: average(total_amount, count),
        average_party_size: average(Decimal::from(total_party), count),
        average_duration: average(Decimal::from(total_duration), count),
        average_tip: average(total_tips, count),
        payment_method_distribution: distribution,
    }
}

pub fn aggregate(records: &[TicketRecord], filter: &TicketFilter) -> PeriodSummary {
    summarize(&filter_records(records, filter))
}

// Vendas agrupadas por dia (UTC), em ordem crescente de data.
pub fn daily_sales(records: &[TicketRecord], filter: &TicketFilter) -> Vec<SalesChartEntry> {
    let mut by_day = BTreeMap::new();

    for record in filter_records(records, filter) {
        let (total, count) = by_day
            .entry(record.timestamp.date_naive())
            .or_insert((Decimal::ZERO, 0u32));
        *total += record.total_amount;
        *count += 1;
    }

    by_day
        .into_iter()
        .map(|(date, (total, count))| SalesChartEntry { date, total, count })
        .collect()
}

pub fn revenue_by_payment_method(records: &[TicketRecord], filter: &TicketFilter) -> Vec<PaymentMethodRevenue> {
    let mut by_method = BTreeMap::new();

    for record in filter_records(records, filter) {
        let (total, count) = by_method
            .entry(record.payment_method)
            .or_insert((Decimal::ZERO, 0u32));
        *total += record.total_amount;
        *count += 1;
    }

    by_method
        .into_iter()
        .map(|(payment_method, (total, count))| PaymentMethodRevenue { payment_method, total, count })
        .collect()
}
