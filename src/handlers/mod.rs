mod fallback;
mod gate;
mod metrics;
mod play;

pub use fallback::{method_not_allowed, not_found};
pub use gate::admission_gate;
pub use metrics::metrics_handler;
pub use play::play_handler;
