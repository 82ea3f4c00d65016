//! Services layer for the identity service.
//!
//! Each component of the core lives here: token store, lockout guard,
//! invitation resolver, SSO tenant resolver, credential authenticator,
//! and session issuer.

mod auth;
mod email;
pub mod error;
mod invitation;
mod jwt;
mod lockout;
mod session;
mod sso;
mod token;

pub use auth::{AuthService, LoginMethod, LoginOutcome};
pub use email::{EmailProvider, EmailService, MockEmailService, SentEmail, SentEmailKind};
pub use error::ServiceError;
pub use invitation::{InvitationGrant, InvitationService};
pub use jwt::{JwtService, SessionClaims};
pub use lockout::LockoutService;
pub use session::{IssuedSession, SessionIdentity, SessionService};
pub use sso::{SsoHint, SsoResolution, SsoService};
pub use token::{TokenClaims, TokenService};
