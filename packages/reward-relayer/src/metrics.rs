//! Lock-free counters exposed at `/metrics`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    // --- Claims ---
    pub claims_total: AtomicU64,
    pub claims_mined: AtomicU64,
    pub claims_timed_out: AtomicU64,
    pub claims_cancelled: AtomicU64,
    pub claims_submit_error: AtomicU64,
    pub claims_config_error: AtomicU64,
    pub claims_invalid: AtomicU64,
    pub claims_busy: AtomicU64,
    pub claim_duration_us_sum: AtomicU64,
    pub claim_duration_us_max: AtomicU64,

    // --- Status polling ---
    pub status_checks_total: AtomicU64,
    pub status_check_errors: AtomicU64,
    pub in_flight_polls: AtomicU64,
}

impl Metrics {
    const fn new() -> Self {
        Self {
            claims_total: AtomicU64::new(0),
            claims_mined: AtomicU64::new(0),
            claims_timed_out: AtomicU64::new(0),
            claims_cancelled: AtomicU64::new(0),
            claims_submit_error: AtomicU64::new(0),
            claims_config_error: AtomicU64::new(0),
            claims_invalid: AtomicU64::new(0),
            claims_busy: AtomicU64::new(0),
            claim_duration_us_sum: AtomicU64::new(0),
            claim_duration_us_max: AtomicU64::new(0),
            status_checks_total: AtomicU64::new(0),
            status_check_errors: AtomicU64::new(0),
            in_flight_polls: AtomicU64::new(0),
        }
    }

    pub fn record_claim_duration(&self, start: Instant) {
        let us = start.elapsed().as_micros() as u64;
        self.claim_duration_us_sum.fetch_add(us, Ordering::Relaxed);
        self.claim_duration_us_max.fetch_max(us, Ordering::Relaxed);
    }

    /// Render in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let claims_total = self.claims_total.load(Ordering::Relaxed);
        let claims_mined = self.claims_mined.load(Ordering::Relaxed);
        let claims_timed_out = self.claims_timed_out.load(Ordering::Relaxed);
        let claims_cancelled = self.claims_cancelled.load(Ordering::Relaxed);
        let claims_submit_error = self.claims_submit_error.load(Ordering::Relaxed);
        let claims_config_error = self.claims_config_error.load(Ordering::Relaxed);
        let claims_invalid = self.claims_invalid.load(Ordering::Relaxed);
        let claims_busy = self.claims_busy.load(Ordering::Relaxed);
        let dur_sum = self.claim_duration_us_sum.load(Ordering::Relaxed);
        let dur_max = self.claim_duration_us_max.swap(0, Ordering::Relaxed);
        let checks_total = self.status_checks_total.load(Ordering::Relaxed);
        let check_errors = self.status_check_errors.load(Ordering::Relaxed);
        let in_flight = self.in_flight_polls.load(Ordering::Relaxed);

        // Prometheus wants seconds.
        let dur_sum_s = dur_sum as f64 / 1_000_000.0;
        let dur_max_s = dur_max as f64 / 1_000_000.0;

        format!(
            "\
# HELP relayer_claims_total Total claim requests received.\n\
# TYPE relayer_claims_total counter\n\
relayer_claims_total {claims_total}\n\
# HELP relayer_claims_mined_total Claims confirmed mined (HTTP 200).\n\
# TYPE relayer_claims_mined_total counter\n\
relayer_claims_mined_total {claims_mined}\n\
# HELP relayer_claims_timed_out_total Claims not mined within the poll budget (HTTP 408).\n\
# TYPE relayer_claims_timed_out_total counter\n\
relayer_claims_timed_out_total {claims_timed_out}\n\
# HELP relayer_claims_cancelled_total Claims whose polling was cancelled.\n\
# TYPE relayer_claims_cancelled_total counter\n\
relayer_claims_cancelled_total {claims_cancelled}\n\
# HELP relayer_claims_submit_error_total Mint submissions rejected by the engine.\n\
# TYPE relayer_claims_submit_error_total counter\n\
relayer_claims_submit_error_total {claims_submit_error}\n\
# HELP relayer_claims_config_error_total Claims refused due to missing configuration.\n\
# TYPE relayer_claims_config_error_total counter\n\
relayer_claims_config_error_total {claims_config_error}\n\
# HELP relayer_claims_invalid_total Claims with an unusable request body.\n\
# TYPE relayer_claims_invalid_total counter\n\
relayer_claims_invalid_total {claims_invalid}\n\
# HELP relayer_claims_busy_total Claims refused because every claim slot was taken.\n\
# TYPE relayer_claims_busy_total counter\n\
relayer_claims_busy_total {claims_busy}\n\
# HELP relayer_claim_duration_seconds_sum Total claim handler time (seconds).\n\
# TYPE relayer_claim_duration_seconds_sum counter\n\
relayer_claim_duration_seconds_sum {dur_sum_s:.6}\n\
# HELP relayer_claim_duration_seconds_max Max claim handler time since last scrape (seconds).\n\
# TYPE relayer_claim_duration_seconds_max gauge\n\
relayer_claim_duration_seconds_max {dur_max_s:.6}\n\
# HELP relayer_status_checks_total Engine status checks issued.\n\
# TYPE relayer_status_checks_total counter\n\
relayer_status_checks_total {checks_total}\n\
# HELP relayer_status_check_errors_total Status checks that failed and counted as not mined.\n\
# TYPE relayer_status_check_errors_total counter\n\
relayer_status_check_errors_total {check_errors}\n\
# HELP relayer_in_flight_polls Claims currently polling for confirmation.\n\
# TYPE relayer_in_flight_polls gauge\n\
relayer_in_flight_polls {in_flight}\n"
        )
    }
}
