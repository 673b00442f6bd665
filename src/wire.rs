use serde::{Deserialize, Serialize};

// =============================================================================
// Request / response bodies
// =============================================================================

#[derive(Debug, Serialize)]
pub struct SignupRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Body of `/signup` and `/order/close` responses.
#[derive(Debug, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct OpenOrderRequest<'a> {
    pub qty: f64,
    pub asset: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leverage: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OpenOrderResponse {
    #[serde(default)]
    pub order_id: String,
}

#[derive(Debug, Serialize)]
pub struct CloseOrderRequest<'a> {
    pub order_id: &'a str,
}
