//! Authentication service business logic.

mod auth_service;
mod authorization;
mod clock;
mod token_service;

pub use auth_service::{AuthService, Authenticator};
pub use authorization::{require_admin, require_role, require_self_or_admin};
pub use clock::{Clock, SystemClock};
pub use token_service::{Claims, InvalidCredential, TokenResponse, TokenService};
