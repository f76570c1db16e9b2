use serde::{Deserialize, Serialize};

/// Role attached to the verified caller by the identity layer.
///
/// The core trusts this claim as-is; class-level administration rights live
/// with the roster collaborator, not here.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CallerRole {
    Staff,
    Teacher,
    Student,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: i64,
    pub role: CallerRole,
    pub exp: usize,
}

#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);
