//! `GET /`: plain-text banner.

pub const BANNER: &str = "Welcome to the Aviary backend";

pub async fn index_handler() -> &'static str {
    BANNER
}
