//! JSON shapes exchanged with the dispatch backend.

use serde::{Deserialize, Deserializer, Serialize};

use crate::ecs::RideId;

/// Deserializes a distance that may arrive as a number, a numeric string, or
/// not at all.
pub(crate) fn lenient_f64<'de, D: Deserializer<'de>>(de: D) -> Result<Option<f64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(de)? {
        Some(Raw::Number(n)) if n.is_finite() => Some(n),
        Some(Raw::Text(s)) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RegisterRequest<'a> {
    #[serde(rename = "rickshawID")]
    pub(super) vehicle_id: &'a str,
    #[serde(rename = "pullerName")]
    pub(super) operator_name: &'a str,
    pub(super) phone_number: &'a str,
    pub(super) current_lat: f64,
    pub(super) current_lng: f64,
}

#[derive(Serialize)]
pub(super) struct AcceptRequest<'a> {
    #[serde(rename = "rideID")]
    pub(super) ride_id: &'a RideId,
    #[serde(rename = "rickshawID")]
    pub(super) vehicle_id: &'a str,
}

#[derive(Serialize)]
pub(super) struct PickupRequest<'a> {
    #[serde(rename = "rideID")]
    pub(super) ride_id: &'a RideId,
}

#[derive(Serialize)]
pub(super) struct CompleteRequest<'a> {
    #[serde(rename = "rideID")]
    pub(super) ride_id: &'a RideId,
    #[serde(rename = "dropLat")]
    pub(super) drop_lat: f64,
    #[serde(rename = "dropLng")]
    pub(super) drop_lng: f64,
}

#[derive(Serialize)]
pub(super) struct LocationUpdate<'a> {
    #[serde(rename = "rickshawID")]
    pub(super) vehicle_id: &'a str,
    pub(super) lat: f64,
    pub(super) lng: f64,
}

#[derive(Serialize)]
pub(super) struct PendingRequestQuery<'a> {
    #[serde(rename = "rickshawID")]
    pub(super) vehicle_id: &'a str,
}

#[derive(Deserialize)]
pub(super) struct PendingResponse {
    #[serde(default)]
    pub(super) rides: Vec<super::RideOffer>,
}

#[derive(Deserialize)]
pub(super) struct AcceptResponse {
    #[serde(default)]
    pub(super) success: bool,
}

#[derive(Deserialize)]
pub(super) struct CompleteResponse {
    #[serde(default)]
    pub(super) points: i64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub(super) distance: Option<f64>,
    #[serde(default)]
    pub(super) status: Option<String>,
}
