use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate, Default)]
pub struct IssueTokenReq {
    /// Token lifetime; defaults to the configured `QR_TOKEN_TTL_SECONDS`.
    #[validate(range(min = 30, max = 3600))]
    pub ttl_seconds: Option<i64>,
}

#[derive(Debug, Serialize, Default)]
pub struct QrTokenResponse {
    pub id: i64,
    pub session_id: i64,
    pub secret: String,
    pub issued_at: String,
    pub expires_at: String,
    pub revoked: bool,
    pub scan_count: i64,
}

impl From<db::models::qr_token::Model> for QrTokenResponse {
    fn from(m: db::models::qr_token::Model) -> Self {
        Self {
            id: m.id,
            session_id: m.session_id,
            secret: m.secret,
            issued_at: m.issued_at.to_rfc3339(),
            expires_at: m.expires_at.to_rfc3339(),
            revoked: m.revoked,
            scan_count: m.scan_count,
        }
    }
}
