//! Identity: who is calling, and what they may do.
//! Keep the public surface thin and split implementation across sub-modules.

mod gate;
mod principal;
mod resolver;
mod role;
mod sources;

pub use gate::{authorize, Denial};
pub use principal::Principal;
pub use resolver::{AuthError, SessionResolver};
pub use role::Role;
pub use sources::{extract_credential, BearerHeader, CredentialSource, TokenCookie, TOKEN_COOKIE};
