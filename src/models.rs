use serde::{Deserialize, Serialize};

/// Bearer token claims issued by the HR portal at login.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Employee display name
    pub sub: String,
    pub exp: usize,
    pub jti: String,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<String>,
}
