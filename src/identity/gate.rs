use super::principal::Principal;
use super::role::Role;

/// Why the gate refused a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    Unauthenticated,
    /// Authenticated but the wrong role; carries the role the route demands
    /// for the client-facing message.
    InsufficientRole { required: Role },
}

/// Pure allow/deny decision for a role-gated route. No I/O.
///
/// Ordered rules: no identity denies, the override role allows everything,
/// otherwise the roles must match exactly.
pub fn authorize(principal: Option<&Principal>, required: Role) -> Result<(), Denial> {
    let Some(p) = principal else {
        return Err(Denial::Unauthenticated);
    };
    if p.role == Role::OVERRIDE {
        return Ok(());
    }
    if p.role == required {
        return Ok(());
    }
    Err(Denial::InsufficientRole { required })
}
