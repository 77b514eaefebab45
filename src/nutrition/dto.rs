use serde::{Deserialize, Serialize};

use super::estimator::NutritionRecord;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub food: Option<String>,
    pub date: Option<String>,
    /// Data URL (`data:image/png;base64,...`) or bare base64.
    pub image: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub food: Option<String>,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
    pub date: Option<String>,
    pub time: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FoodPayload {
    pub food: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub date: String,
    pub time: String,
}

impl FoodPayload {
    pub fn from_record(r: NutritionRecord, date: String, time: String) -> Self {
        Self {
            food: r.food,
            calories: r.calories,
            protein: r.protein_g,
            carbs: r.carbs_g,
            fat: r.fat_g,
            date,
            time,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    #[serde(flatten)]
    pub payload: FoodPayload,
    pub logged: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmResponse {
    #[serde(flatten)]
    pub payload: FoodPayload,
    pub logged: bool,
    pub row_index: Option<usize>,
}
