use serde::{Deserialize, Serialize};

pub const DEVICE_TYPE: &str = "LoRa Keychain (Simulated)";
pub const ALERT_DETAILS: &str = "Panic Button Pressed (Long Range)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

/// Emergency record written to the `emergencies` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub status: AlertStatus,
    pub timestamp: i64, // epoch millis
    pub location: Location,
    pub device_type: String,
    pub details: String,
}
