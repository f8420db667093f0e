use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::LeadId;

/// Rendered message handed to the notification collaborator. The core only
/// needs success/failure back and never blocks on delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub template: String,
    pub lead_id: LeadId,
    pub contact: String,
    pub details: BTreeMap<String, String>,
}

/// Notification dispatch error. Always degraded to a warning by callers.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Fire-and-forget outbound message hook (SMS/WhatsApp/email adapters).
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError>;
}

/// Device-reported coordinate handed in at check-in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Geo-verification failure. "Too far" and "unavailable" are both warnings
/// requiring human override, never hard failures.
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("geo verification unavailable: {0}")]
    Unavailable(String),
}

/// Distance check against a project site, reception flow only.
pub trait GeoVerifier: Send + Sync {
    /// Distance in meters between the reported point and the project site.
    fn distance_to_project(&self, project: &str, point: GeoPoint) -> Result<f64, GeoError>;
}
