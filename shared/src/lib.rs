use serde::{Deserialize, Serialize};

/// Geographic coordinate as the map layer speaks it: `lat`/`lng`.
///
/// Doubles as the detail payload of the `map-click` and `device-position`
/// CustomEvents dispatched by the JS map shim.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Catalog entry for a recyclable-item category. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub title: String,
    pub image_url: String,
}

/// POST body for creating a collection point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPoint {
    pub name: String,
    pub email: String,
    pub whatsapp: String,
    pub uf: String,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub items: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}
