use tracing::debug;

use crate::auth::{AuthError, Claims, Permission};

/// Check that `claims` hold every permission in `required`
pub fn authorize(claims: &Claims, required: &[Permission]) -> Result<(), AuthError> {
    for permission in required {
        if !claims.has_permission(*permission) {
            debug!("Subject {} lacks {}", claims.sub, permission);
            return Err(AuthError::MissingPermission(permission.to_string()));
        }
    }
    Ok(())
}
