//! Business logic services layer

pub mod auth_service;
pub mod credentials;
pub mod email_service;
pub mod session_service;
pub mod user_service;

pub use auth_service::{AuthService, LogoutOutcome};
pub use credentials::CredentialVerifier;
pub use email_service::{
    AccountEmail, EmailError, EmailSender, LoggingEmailSender, SmtpEmailSender,
};
pub use session_service::SessionService;
pub use user_service::UserService;
