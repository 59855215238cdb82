use common_money::Money;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub code: String,
    #[serde(rename = "productName")]
    pub name: String,
    pub price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(rename = "productUrl", default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chair {
    pub id: String,
    #[serde(rename = "reservation", default)]
    pub reserved: bool,
}

impl Chair {
    pub fn available(id: impl Into<String>) -> Self { Self { id: id.into(), reserved: false } }
}

/// A screening with its seat map. `chairs` is always written back as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieSession {
    pub id: String,
    #[serde(rename = "movieTitle")]
    pub title: String,
    #[serde(rename = "movieSession")]
    pub session: String,
    #[serde(rename = "moviePrice")]
    pub price: Money,
    #[serde(rename = "movieCategory", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "moviePoster", default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(rename = "movieLanguage", default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(rename = "movieChairs", default)]
    pub chairs: Vec<Chair>,
}

impl MovieSession {
    pub fn chair(&self, id: &str) -> Option<&Chair> { self.chairs.iter().find(|c| c.id == id) }
}

/// Front-desk details for a cinema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CinemaInfo {
    pub id: String,
    pub cinema_name: String,
    pub address: String,
    pub phone: String,
}
