//! Authentication module: tokens, password hashing, cookies, bearer and admin auth

pub mod basic;
pub mod cookies;
pub mod jwt;
pub mod middleware;
pub mod password;

pub use jwt::{AccessClaims, Claims, JwtService, TokenError, TokenPair, TokenType};
pub use basic::{admin_auth_middleware, AdminCredentials};
pub use middleware::{extract_token, jwt_auth_middleware, optional_auth_middleware, AuthContext};
pub use password::PasswordHasher;
