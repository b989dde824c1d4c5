//! Prometheus metrics for collections-service.

use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, CounterVec, TextEncoder};

/// Invoice status transition counter.
pub static INVOICE_TRANSITIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "collections_invoice_transitions_total",
        "Total number of invoice status transitions",
        &["from", "to"]
    )
    .expect("Failed to register invoice_transitions_total")
});

/// Invoice counter by status at creation.
pub static INVOICES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "collections_invoices_total",
        "Total number of invoices created by status",
        &["status"] // draft, pending
    )
    .expect("Failed to register invoices_total")
});

/// Case stage-change counter.
pub static CASE_STAGE_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "collections_case_stage_total",
        "Total number of collection case stage entries",
        &["stage"]
    )
    .expect("Failed to register case_stage_total")
});

/// Bulk item settlement counter.
pub static BULK_ITEMS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "collections_bulk_items_total",
        "Total number of bulk operation items by outcome",
        &["outcome"] // updated, failed
    )
    .expect("Failed to register bulk_items_total")
});

/// Organization provisioning counter.
pub static ORGANIZATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "collections_organizations_total",
        "Total number of organization provisioning results",
        &["outcome"] // created, duplicate
    )
    .expect("Failed to register organizations_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "collections_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&INVOICE_TRANSITIONS_TOTAL);
    Lazy::force(&INVOICES_TOTAL);
    Lazy::force(&CASE_STAGE_TOTAL);
    Lazy::force(&BULK_ITEMS_TOTAL);
    Lazy::force(&ORGANIZATIONS_TOTAL);
    Lazy::force(&ERRORS_TOTAL);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
