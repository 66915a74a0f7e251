use lazy_static::lazy_static;
use prometheus::{
    Counter, Encoder, Gauge, Histogram, TextEncoder, register_counter, register_gauge,
    register_histogram,
};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("announcement_requests_total", "Total number of play requests").unwrap();
    pub static ref RATE_LIMITED: Counter =
        register_counter!("announcement_rate_limited_total", "Clients pushed over the rate limit").unwrap();
    pub static ref PLAYBACK_SUCCESS: Counter =
        register_counter!("announcement_playback_success_total", "Announcements played").unwrap();
    pub static ref PLAYBACK_FAILURES: Counter =
        register_counter!("announcement_playback_failures_total", "Failed or timed out playbacks").unwrap();
    pub static ref PLAYBACK_LATENCY: Histogram = register_histogram!(
        "announcement_playback_seconds",
        "Time spent running the player in seconds"
    )
    .unwrap();
    pub static ref TRACKED_CLIENTS: Gauge =
        register_gauge!("announcement_tracked_clients", "Clients with a live rate-limit window").unwrap();
}

// Render every registered metric in the text exposition format
pub fn render() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("encode failed: {}", e))?;
    String::from_utf8(buffer).map_err(|e| format!("metrics not utf-8: {}", e))
}
