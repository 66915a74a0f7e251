use std::sync::Arc;
use tokio::sync::Mutex;
use crate::auth::TokenStore;
use crate::player::Player;
use crate::rate_limit::RateLimiter;
use crate::validation::RequestValidator;
// app's shared state

pub struct AppState {
    pub rate_limiter: Arc<RateLimiter>,
    pub validator: RequestValidator,
    pub tokens: TokenStore,
    pub player: Player,
    pub playback: Arc<Mutex<()>>, // held while a player is running
    pub max_body: usize,          // largest accepted body in bytes
    pub require_auth: bool,
    pub metrics_enabled: bool,
}

impl AppState {
    pub fn new(
        rate_limiter: Arc<RateLimiter>,
        validator: RequestValidator,
        tokens: TokenStore,
        player: Player,
    ) -> Self {
        Self {
            rate_limiter,
            validator,
            tokens,
            player,
            playback: Arc::new(Mutex::new(())),
            max_body: 1024,
            require_auth: false,
            metrics_enabled: false,
        }
    }
}
