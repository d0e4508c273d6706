//! Device session models

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One logged-in device
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Session {
    pub device_id: String,
    pub user_id: Uuid,
    pub ip: String,
    /// User-Agent of the login request
    pub title: String,
    pub last_active_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: Uuid, device_id: &str, ip: &str, title: &str) -> Self {
        let now = Utc::now();
        Self {
            device_id: device_id.to_string(),
            user_id,
            ip: ip.to_string(),
            title: title.to_string(),
            last_active_date: now,
            created_at: now,
        }
    }
}

/// `GET /security/devices` item
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceView {
    pub ip: String,
    pub title: String,
    pub last_active_date: DateTime<Utc>,
    pub device_id: String,
}

impl From<Session> for DeviceView {
    fn from(session: Session) -> Self {
        Self {
            ip: session.ip,
            title: session.title,
            last_active_date: session.last_active_date,
            device_id: session.device_id,
        }
    }
}
