pub mod dropdown;
pub mod health;
pub mod terminals;

/// `OPTIONS` answer for CORS preflight requests.
pub async fn preflight() -> &'static str {
    "ok"
}
