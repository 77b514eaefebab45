use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Macros {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

/// A row about to be appended; it has no index until the next read.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub date: String,
    pub time: String,
    pub food: String,
    pub macros: Macros,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub date: String,
    pub time: String,
    pub food: String,
    #[serde(flatten)]
    pub macros: Macros,
    pub row_index: usize,
}

/// Daily goals share the four-macro shape.
pub type Targets = Macros;

/// Body of `PUT /entries/:rowIndex` and `PUT /settings/targets`. Every field
/// is required; missing ones are reported as a validation error.
#[derive(Debug, Deserialize)]
pub struct MacrosBody {
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
}

impl MacrosBody {
    pub fn into_macros(self) -> Option<Macros> {
        Some(Macros {
            calories: self.calories?,
            protein: self.protein?,
            carbs: self.carbs?,
            fat: self.fat?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub period: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EntriesQuery {
    pub date: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EntriesResponse {
    pub entries: Vec<LedgerEntry>,
    pub authenticated: bool,
}

#[derive(Debug, Serialize)]
pub struct UnauthenticatedResponse {
    pub error: String,
    pub authenticated: bool,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    #[serde(flatten)]
    pub summary: super::summary::Summary,
    pub authenticated: bool,
}
