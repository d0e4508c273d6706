//! 凭据校验：登录名 + 密码

use crate::{
    auth::password::PasswordHasher,
    error::AppError,
    models::user::UserIdentity,
    repository::UserRepository,
};
use std::sync::Arc;

pub struct CredentialVerifier {
    users: Arc<dyn UserRepository>,
    hasher: Arc<PasswordHasher>,
}

impl CredentialVerifier {
    pub fn new(users: Arc<dyn UserRepository>, hasher: Arc<PasswordHasher>) -> Self {
        Self { users, hasher }
    }

    /// `Ok(None)` for an unknown login or a wrong password; only storage
    /// failures are errors.
    pub async fn validate(
        &self,
        login: &str,
        password: &str,
    ) -> Result<Option<UserIdentity>, AppError> {
        let Some(user) = self.users.find_by_login(login).await? else {
            return Ok(None);
        };

        match self.hasher.verify(password, &user.password_hash) {
            Ok(true) => Ok(Some(UserIdentity::from(&user))),
            Ok(false) => Ok(None),
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "Stored password hash is unreadable");
                Ok(None)
            }
        }
    }
}
