//! In-memory repositories for local runs and tests

use super::{SessionRepository, UserRepository};
use crate::{
    error::AppError,
    models::{
        session::Session,
        user::{SortDirection, User, UsersQuery, UsersSortBy},
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: DashMap<Uuid, User>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn find_active(&self, predicate: impl Fn(&User) -> bool) -> Option<User> {
        self.users
            .iter()
            .find(|entry| !entry.is_deleted() && predicate(entry.value()))
            .map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .get(&id)
            .filter(|user| !user.is_deleted())
            .map(|user| user.value().clone()))
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<User>, AppError> {
        Ok(self.find_active(|user| user.login == login))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.find_active(|user| user.email == email))
    }

    async fn find_by_confirmation_code(&self, code: &str) -> Result<Option<User>, AppError> {
        Ok(self.find_active(|user| {
            user.confirmation_code.as_deref() == Some(code)
                || user.confirmed_with_code.as_deref() == Some(code)
        }))
    }

    async fn find_by_recovery_code(&self, code: &str) -> Result<Option<User>, AppError> {
        Ok(self.find_active(|user| user.recovery_code.as_deref() == Some(code)))
    }

    async fn login_exists(&self, login: &str) -> Result<bool, AppError> {
        Ok(self.users.iter().any(|entry| entry.login == login))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        Ok(self.users.iter().any(|entry| entry.email == email))
    }

    async fn find_page(&self, query: &UsersQuery) -> Result<(Vec<User>, u64), AppError> {
        let mut users: Vec<User> = self
            .users
            .iter()
            .filter(|entry| !entry.is_deleted() && query.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        users.sort_by(|a, b| {
            let ordering = match query.sort_by {
                UsersSortBy::CreatedAt => a.created_at.cmp(&b.created_at),
                UsersSortBy::Login => a.login.cmp(&b.login),
                UsersSortBy::Email => a.email.cmp(&b.email),
            }
            .then_with(|| a.id.cmp(&b.id));
            match query.sort_direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });

        let total = users.len() as u64;
        let page = users
            .into_iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(query.page_size).unwrap_or(usize::MAX))
            .collect();
        Ok((page, total))
    }

    async fn store(&self, user: &User) -> Result<(), AppError> {
        self.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn delete_all(&self) -> Result<u64, AppError> {
        let mut removed = 0u64;
        self.users.retain(|_, _| {
            removed += 1;
            false
        });
        Ok(removed)
    }
}

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: DashMap<String, Session>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    // 计数在 retain 内完成，并发插入不会影响结果
    fn delete_where(&self, predicate: impl Fn(&Session) -> bool) -> u64 {
        let mut removed = 0u64;
        self.sessions.retain(|_, session| {
            if predicate(session) {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn insert(&self, session: &Session) -> Result<(), AppError> {
        self.sessions
            .insert(session.device_id.clone(), session.clone());
        Ok(())
    }

    async fn find_by_device_id(&self, device_id: &str) -> Result<Option<Session>, AppError> {
        Ok(self.sessions.get(device_id).map(|s| s.value().clone()))
    }

    async fn update_last_active(
        &self,
        device_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        match self.sessions.get_mut(device_id) {
            Some(mut session) => {
                session.last_active_date = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_by_device_id(&self, device_id: &str) -> Result<bool, AppError> {
        Ok(self.sessions.remove(device_id).is_some())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Session>, AppError> {
        let mut sessions: Vec<Session> = self
            .sessions
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        sessions.sort_by(|a, b| b.last_active_date.cmp(&a.last_active_date));
        Ok(sessions)
    }

    async fn delete_for_user(&self, user_id: Uuid, device_id: &str) -> Result<bool, AppError> {
        Ok(self
            .sessions
            .remove_if(device_id, |_, session| session.user_id == user_id)
            .is_some())
    }

    async fn delete_all_for_user_except(
        &self,
        user_id: Uuid,
        except_device_id: &str,
    ) -> Result<u64, AppError> {
        Ok(self.delete_where(|s| s.user_id == user_id && s.device_id != except_device_id))
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        Ok(self.delete_where(|s| s.user_id == user_id))
    }

    async fn delete_all(&self) -> Result<u64, AppError> {
        Ok(self.delete_where(|_| true))
    }
}
