use axum::Json;
use serde::{Deserialize, Serialize};

use crate::experience::calculator::calculate_total_experience;
use crate::models::resume::Experience;

#[derive(Debug, Deserialize)]
pub struct CalculateRequest {
    #[serde(default)]
    pub experience: Vec<Experience>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateResponse {
    pub total_experience: String,
}

/// POST /api/v1/experience/calculate
/// Recomputes the total for an already stored work history.
pub async fn handle_calculate(Json(req): Json<CalculateRequest>) -> Json<CalculateResponse> {
    Json(CalculateResponse {
        total_experience: calculate_total_experience(&req.experience),
    })
}
