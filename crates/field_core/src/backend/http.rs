use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::BackendError;
use super::registry::RideRegistry;
use super::wire::{
    AcceptRequest, AcceptResponse, CompleteRequest, CompleteResponse, LocationUpdate, PendingRequestQuery,
    PendingResponse, PickupRequest, RegisterRequest,
};
use super::{AcceptOutcome, CompletionReceipt, DispatchBackend, RideOffer};
use crate::config::{BackendConfig, VehicleProfile};
use crate::ecs::{RideId, VehicleId};
use crate::geo::Coordinate;

const PENDING_REVIEW: &str = "PENDING_REVIEW";

/// Blocking HTTP client for the dispatch backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    accept_timeout: Duration,
    registry_limit: u32,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            accept_timeout: Duration::from_millis(config.accept_timeout_ms),
            registry_limit: config.registry_limit,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn post<B: Serialize>(&self, path: &str, body: &B) -> RequestBuilder {
        self.client.post(self.url(path)).json(body)
    }

    fn send(request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request.send()?;
        if response.status() != StatusCode::OK {
            return Err(BackendError::Status(response.status().as_u16()));
        }
        Ok(response)
    }

    fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, BackendError> {
        let body = Self::send(request)?.text()?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl DispatchBackend for HttpBackend {
    fn register(&self, profile: &VehicleProfile, position: Coordinate) -> Result<(), BackendError> {
        let body = RegisterRequest {
            vehicle_id: profile.vehicle_id.as_str(),
            operator_name: &profile.operator_name,
            phone_number: &profile.phone_number,
            current_lat: position.lat,
            current_lng: position.lng,
        };
        Self::send(self.post("/rickshaw/register", &body)).map(|_| ())
    }

    fn pending_offers(&self, vehicle: &VehicleId) -> Result<Vec<RideOffer>, BackendError> {
        let request = self
            .client
            .get(self.url("/ride/pending"))
            .query(&PendingRequestQuery {
                vehicle_id: vehicle.as_str(),
            });
        let parsed: PendingResponse = Self::send_json(request)?;
        Ok(parsed.rides)
    }

    fn accept(&self, ride: &RideId, vehicle: &VehicleId) -> Result<AcceptOutcome, BackendError> {
        let body = AcceptRequest {
            ride_id: ride,
            vehicle_id: vehicle.as_str(),
        };
        let request = self.post("/ride/accept", &body).timeout(self.accept_timeout);
        let parsed: AcceptResponse = Self::send_json(request)?;
        Ok(if parsed.success {
            AcceptOutcome::Granted
        } else {
            AcceptOutcome::Taken
        })
    }

    fn confirm_pickup(&self, ride: &RideId) -> Result<(), BackendError> {
        Self::send(self.post("/ride/pickup", &PickupRequest { ride_id: ride })).map(|_| ())
    }

    fn complete(&self, ride: &RideId, drop: Coordinate) -> Result<CompletionReceipt, BackendError> {
        let body = CompleteRequest {
            ride_id: ride,
            drop_lat: drop.lat,
            drop_lng: drop.lng,
        };
        let parsed: CompleteResponse = Self::send_json(self.post("/ride/complete", &body))?;
        Ok(CompletionReceipt {
            points: u32::try_from(parsed.points.max(0)).unwrap_or(u32::MAX),
            drop_distance_m: parsed.distance,
            pending_review: parsed.status.as_deref() == Some(PENDING_REVIEW),
        })
    }

    fn ride_registry(&self) -> Result<RideRegistry, BackendError> {
        let request = self
            .client
            .get(self.url("/admin/rides"))
            .query(&[("limit", self.registry_limit)]);
        let body: serde_json::Value = Self::send_json(request)?;
        RideRegistry::from_value(body).map_err(|err| BackendError::Malformed(err.to_string()))
    }

    fn push_location(&self, vehicle: &VehicleId, position: Coordinate) -> Result<(), BackendError> {
        let body = LocationUpdate {
            vehicle_id: vehicle.as_str(),
            lat: position.lat,
            lng: position.lng,
        };
        Self::send(self.post("/rickshaw/location", &body)).map(|_| ())
    }
}
