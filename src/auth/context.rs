use actix_web::{FromRequest, HttpRequest, dev::Payload, error::ErrorUnauthorized};
use futures::future::{Ready, ready};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    Admin = 1,
    Manager = 2,
    Employee = 3,
    System = 4,
    ApiUser = 5,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Manager),
            3 => Some(Role::Employee),
            4 => Some(Role::System),
            5 => Some(Role::ApiUser),
            _ => None,
        }
    }
}

/// Resolved caller identity, supplied by the authenticating front door in
/// headers. The core trusts this context; it never authenticates
/// credentials itself.
pub struct ActorContext {
    pub user_id: u64,
    pub company_id: u64,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

fn header_u64(req: &HttpRequest, name: &str) -> Option<u64> {
    req.headers()
        .get(name)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.parse().ok())
}

impl FromRequest for ActorContext {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let user_id = match header_u64(req, "X-User-Id") {
            Some(v) => v,
            None => return ready(Err(ErrorUnauthorized("Missing identity context"))),
        };

        let company_id = match header_u64(req, "X-Company-Id") {
            Some(v) => v,
            None => return ready(Err(ErrorUnauthorized("Missing company context"))),
        };

        let role = match header_u64(req, "X-Role")
            .and_then(|v| u8::try_from(v).ok())
            .and_then(Role::from_id)
        {
            Some(r) => r,
            None => return ready(Err(ErrorUnauthorized("Invalid role"))),
        };

        ready(Ok(ActorContext {
            user_id,
            company_id,
            role,
            employee_id: header_u64(req, "X-Employee-Id"),
        }))
    }
}

impl ActorContext {
    pub fn require_admin(&self) -> actix_web::Result<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Admin only"))
        }
    }

    pub fn require_manager_or_admin(&self) -> actix_web::Result<()> {
        if matches!(self.role, Role::Admin | Role::Manager) {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Manager/Admin only"))
        }
    }

    /// Returns true if the user is an employee
    pub fn is_employee(&self) -> bool {
        self.role == Role::Employee
    }
}
