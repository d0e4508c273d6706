//! 用户服务：注册、个人信息、管理员用户管理、注销

use crate::{
    auth::password::PasswordHasher,
    config::SecurityConfig,
    error::AppError,
    models::{
        auth::RegistrationRequest,
        user::{
            confirm_email, make_deleted, MeOrDefaultView, MeView, Paginated, User, UserView,
            UsersQuery,
        },
    },
    repository::UserRepository,
    services::{
        email_service::{dispatch, AccountEmail, EmailSender},
        session_service::SessionService,
    },
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

pub struct UserService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<SessionService>,
    hasher: Arc<PasswordHasher>,
    email_sender: Arc<dyn EmailSender>,
    code_ttl: Duration,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<SessionService>,
        hasher: Arc<PasswordHasher>,
        email_sender: Arc<dyn EmailSender>,
        security: &SecurityConfig,
    ) -> Self {
        Self {
            users,
            sessions,
            hasher,
            email_sender,
            code_ttl: security.confirmation_code_ttl(),
        }
    }

    /// 校验字段与唯一性，返回规整后的请求
    async fn checked(&self, req: RegistrationRequest) -> Result<RegistrationRequest, AppError> {
        let req = req.trimmed();
        req.validate().map_err(AppError::Validation)?;

        // 软删除的账号同样占用登录名和邮箱
        if self.users.login_exists(&req.login).await? {
            return Err(AppError::validation("login", "login should be unique"));
        }
        if self.users.email_exists(&req.email).await? {
            return Err(AppError::validation("email", "email should be unique"));
        }

        Ok(req)
    }

    fn pending_user(&self, req: &RegistrationRequest, code: &str) -> Result<User, AppError> {
        let password_hash = self.hasher.hash(&req.password)?;
        Ok(User::new_unconfirmed(
            &req.login,
            &req.email,
            password_hash,
            code.to_string(),
            Utc::now() + self.code_ttl,
        ))
    }

    /// 注册新用户（未确认），并发送确认邮件
    pub async fn register(&self, req: RegistrationRequest) -> Result<User, AppError> {
        let req = self.checked(req).await?;

        let code = Uuid::new_v4().to_string();
        let user = self.pending_user(&req, &code)?;
        self.users.store(&user).await?;

        tracing::info!(user_id = %user.id, login = %user.login, "User registered");

        dispatch(
            self.email_sender.clone(),
            AccountEmail::Confirmation,
            user.email.clone(),
            code,
        );

        Ok(user)
    }

    /// 管理员创建用户：直接视为已确认，不发邮件
    pub async fn create_by_admin(&self, req: RegistrationRequest) -> Result<UserView, AppError> {
        let req = self.checked(req).await?;

        let user = confirm_email(self.pending_user(&req, &Uuid::new_v4().to_string())?);
        self.users.store(&user).await?;

        tracing::info!(user_id = %user.id, login = %user.login, "User created by admin");
        Ok(UserView::from(user))
    }

    pub async fn list_users(&self, query: &UsersQuery) -> Result<Paginated<UserView>, AppError> {
        let (users, total) = self.users.find_page(query).await?;
        let items = users.into_iter().map(UserView::from).collect();

        Ok(Paginated::new(items, total, query))
    }

    pub async fn me(&self, user_id: Uuid) -> Result<MeView, AppError> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(MeView::from)
            .ok_or_else(|| AppError::not_found("user"))
    }

    /// 未认证或用户已不存在时返回匿名视图
    pub async fn me_or_default(&self, user_id: Option<Uuid>) -> Result<MeOrDefaultView, AppError> {
        let Some(user_id) = user_id else {
            return Ok(MeOrDefaultView::anonymous());
        };

        Ok(self
            .users
            .find_by_id(user_id)
            .await?
            .map(|user| MeOrDefaultView::from(MeView::from(user)))
            .unwrap_or_else(MeOrDefaultView::anonymous))
    }

    /// 软删除用户并终止其所有会话
    pub async fn delete_user(&self, user_id: Uuid) -> Result<(), AppError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("user"))?;

        self.users.store(&make_deleted(user)).await?;
        let revoked = self.sessions.delete_all_for_user(user_id).await?;

        tracing::info!(user_id = %user_id, revoked_sessions = revoked, "User deleted");
        Ok(())
    }

    /// 清空所有数据（测试路由）
    pub async fn reset_all(&self) -> Result<(), AppError> {
        let sessions = self.sessions.delete_all().await?;
        let users = self.users.delete_all().await?;

        tracing::warn!(users = users, sessions = sessions, "All data removed");
        Ok(())
    }
}
