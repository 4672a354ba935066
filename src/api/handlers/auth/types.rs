//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::fingerprint::DeviceFingerprint;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub device_fingerprint: DeviceFingerprint,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginUser {
    pub username: String,
    pub uuid: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub access_token: String,
    /// Seconds until the access token expires; clients schedule a refresh
    /// this far minus the configured threshold ahead of time.
    pub expires_in: i64,
    pub user: LoginUser,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RefreshRequest {
    pub device_fingerprint: DeviceFingerprint,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RefreshResponse {
    pub access_token: String,
    pub expires_in: i64,
}
