use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Customer,
    Driver,
    Cleaner,
    Admin,
}

impl std::str::FromStr for Role {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, AppError> {
        match raw {
            "customer" => Ok(Role::Customer),
            "driver" => Ok(Role::Driver),
            "cleaner" => Ok(Role::Cleaner),
            "admin" => Ok(Role::Admin),
            other => Err(AppError::ValidationError(format!("unknown role: {other}"))),
        }
    }
}

/// Identity supplied by the (out-of-scope) auth middleware via headers.
/// The core trusts it unconditionally; role checks live in the handlers.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthContext {
    /// Admin passes every check.
    pub fn require(&self, allowed: &[Role]) -> Result<(), AppError> {
        if self.role == Role::Admin || allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "role {:?} may not perform this operation",
                self.role
            )))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, AppError> {
        let user_id = header(parts, "x-user-id")?
            .parse::<Uuid>()
            .map_err(|err| AppError::ValidationError(format!("invalid x-user-id: {err}")))?;
        let role = header(parts, "x-role")?.parse::<Role>()?;

        Ok(AuthContext { user_id, role })
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, AppError> {
    parts
        .headers
        .get(name)
        .ok_or_else(|| AppError::ValidationError(format!("missing {name} header")))?
        .to_str()
        .map_err(|err| AppError::ValidationError(format!("invalid {name} header: {err}")))
}
