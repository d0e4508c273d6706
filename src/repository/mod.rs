//! Database repository layer
//!
//! Services depend on the traits below; `Pg*` types back them with
//! PostgreSQL and `InMemory*` types with process memory.

pub mod memory;
pub mod session_repo;
pub mod user_repo;

use crate::{
    error::AppError,
    models::{
        session::Session,
        user::{User, UsersQuery},
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use memory::{InMemorySessionRepository, InMemoryUserRepository};
pub use session_repo::PgSessionRepository;
pub use user_repo::PgUserRepository;

/// User persistence. Lookups skip soft-deleted accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn find_by_login(&self, login: &str) -> Result<Option<User>, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Matches the pending code or the code that already confirmed the user
    async fn find_by_confirmation_code(&self, code: &str) -> Result<Option<User>, AppError>;

    async fn find_by_recovery_code(&self, code: &str) -> Result<Option<User>, AppError>;

    /// Includes soft-deleted accounts
    async fn login_exists(&self, login: &str) -> Result<bool, AppError>;

    /// Includes soft-deleted accounts
    async fn email_exists(&self, email: &str) -> Result<bool, AppError>;

    /// One page of active users plus the total number matching the query
    async fn find_page(&self, query: &UsersQuery) -> Result<(Vec<User>, u64), AppError>;

    /// Insert or replace by id
    async fn store(&self, user: &User) -> Result<(), AppError>;

    /// Hard delete every user
    async fn delete_all(&self) -> Result<u64, AppError>;
}

/// Device session persistence
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert(&self, session: &Session) -> Result<(), AppError>;

    async fn find_by_device_id(&self, device_id: &str) -> Result<Option<Session>, AppError>;

    /// Returns whether a session was updated
    async fn update_last_active(
        &self,
        device_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    /// Returns whether a session was removed
    async fn delete_by_device_id(&self, device_id: &str) -> Result<bool, AppError>;

    /// Most recently active first
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Session>, AppError>;

    /// Delete the session only if it belongs to `user_id`
    async fn delete_for_user(&self, user_id: Uuid, device_id: &str) -> Result<bool, AppError>;

    async fn delete_all_for_user_except(
        &self,
        user_id: Uuid,
        except_device_id: &str,
    ) -> Result<u64, AppError>;

    async fn delete_all_for_user(&self, user_id: Uuid) -> Result<u64, AppError>;

    async fn delete_all(&self) -> Result<u64, AppError>;
}
