//! 认证服务：登录、令牌刷新、登出、注册确认、密码找回

use crate::{
    auth::{
        jwt::{JwtService, TokenError, TokenPair, TokenType},
        password::PasswordHasher,
    },
    config::SecurityConfig,
    error::{AppError, AuthError, ConfirmationError},
    models::user::{change_password, confirm_email, set_confirmation_code, set_recovery_code},
    repository::UserRepository,
    services::{
        credentials::CredentialVerifier,
        email_service::{dispatch, AccountEmail, EmailSender},
        session_service::SessionService,
    },
};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// 登出结果；令牌问题不算失败，cookie 总是被清除
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutOutcome {
    SessionEnded,
    SessionAlreadyGone,
    TokenRejected(AuthError),
}

/// 已验证的刷新令牌内容
#[derive(Debug, Clone, PartialEq, Eq)]
struct RefreshIdentity {
    user_id: Uuid,
    device_id: String,
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::Invalid => AuthError::TokenInvalid,
        }
    }
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    credentials: CredentialVerifier,
    sessions: Arc<SessionService>,
    jwt_service: Arc<JwtService>,
    hasher: Arc<PasswordHasher>,
    email_sender: Arc<dyn EmailSender>,
    code_ttl: Duration,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<SessionService>,
        jwt_service: Arc<JwtService>,
        hasher: Arc<PasswordHasher>,
        email_sender: Arc<dyn EmailSender>,
        security: &SecurityConfig,
    ) -> Self {
        Self {
            credentials: CredentialVerifier::new(users.clone(), hasher.clone()),
            users,
            sessions,
            jwt_service,
            hasher,
            email_sender,
            code_ttl: security.confirmation_code_ttl(),
        }
    }

    fn code_expiry(&self) -> DateTime<Utc> {
        Utc::now() + self.code_ttl
    }

    /// 用户登录：每次登录创建一个新的设备会话
    pub async fn login(
        &self,
        login: &str,
        password: &str,
        ip: &str,
        user_agent: &str,
    ) -> Result<TokenPair, AppError> {
        let identity = self
            .credentials
            .validate(login, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        // 先签发令牌，签发失败时不留下孤立会话
        let device_id = Uuid::new_v4().to_string();
        let pair = self
            .jwt_service
            .issue_pair(&identity.id, &identity.login, &device_id)?;

        self.sessions
            .create(identity.id, &device_id, ip, user_agent)
            .await?;

        tracing::info!(user_id = %identity.id, device_id = %device_id, "Login succeeded");
        Ok(pair)
    }

    /// 验证刷新令牌并解析出用户与设备
    fn refresh_identity(&self, refresh_token: &str) -> Result<RefreshIdentity, AuthError> {
        let claims = self.jwt_service.verify(refresh_token)?;

        if claims.token_type != Some(TokenType::Refresh) {
            return Err(AuthError::InvalidPayload);
        }

        let user_id = claims
            .user_id
            .as_deref()
            .and_then(|id| Uuid::parse_str(id).ok())
            .ok_or(AuthError::InvalidPayload)?;
        let device_id = claims
            .device_id
            .filter(|id| !id.is_empty())
            .ok_or(AuthError::InvalidPayload)?;

        Ok(RefreshIdentity { user_id, device_id })
    }

    /// 刷新令牌：同一设备签发新令牌对
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let identity = self.refresh_identity(refresh_token)?;

        let session = self
            .sessions
            .find_by_device_id(&identity.device_id)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        if session.user_id != identity.user_id {
            return Err(AuthError::InvalidPayload.into());
        }

        let user = self
            .users
            .find_by_id(identity.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let pair = self
            .jwt_service
            .issue_pair(&user.id, &user.login, &identity.device_id)?;
        self.sessions.touch(&identity.device_id).await?;

        tracing::debug!(user_id = %user.id, device_id = %identity.device_id, "Tokens refreshed");
        Ok(pair)
    }

    /// 登出：只有存储错误会返回 Err
    pub async fn logout(&self, refresh_token: &str) -> Result<LogoutOutcome, AppError> {
        let identity = match self.refresh_identity(refresh_token) {
            Ok(identity) => identity,
            Err(e) => {
                tracing::debug!(reason = %e, "Logout with unusable refresh token");
                return Ok(LogoutOutcome::TokenRejected(e));
            }
        };

        if self.sessions.delete_by_device_id(&identity.device_id).await? {
            tracing::info!(user_id = %identity.user_id, device_id = %identity.device_id, "Logged out");
            Ok(LogoutOutcome::SessionEnded)
        } else {
            Ok(LogoutOutcome::SessionAlreadyGone)
        }
    }

    /// 当前请求所属设备（用于"终止其他设备"）
    pub async fn current_device(
        &self,
        user_id: Uuid,
        refresh_token: &str,
    ) -> Result<String, AppError> {
        let identity = self.refresh_identity(refresh_token)?;

        if identity.user_id != user_id {
            return Err(AuthError::InvalidPayload.into());
        }

        self.sessions
            .find_by_device_id(&identity.device_id)
            .await?
            .filter(|session| session.user_id == user_id)
            .ok_or(AuthError::SessionNotFound)?;

        Ok(identity.device_id)
    }

    /// 注册确认
    pub async fn confirm_registration(&self, code: &str) -> Result<(), AppError> {
        let user = self
            .users
            .find_by_confirmation_code(code)
            .await?
            .ok_or(ConfirmationError::InvalidCode { field: "code" })?;

        if user.is_email_confirmed {
            return Err(ConfirmationError::AlreadyConfirmed { field: "code" }.into());
        }

        if user.confirmation_expired(Utc::now()) {
            return Err(ConfirmationError::CodeExpired { field: "code" }.into());
        }

        let user = confirm_email(user);
        self.users.store(&user).await?;

        tracing::info!(user_id = %user.id, "Email confirmed");
        Ok(())
    }

    /// 重新发送注册确认邮件（生成新确认码）
    pub async fn resend_confirmation(&self, email: &str) -> Result<(), AppError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(ConfirmationError::UserNotFound { field: "email" })?;

        if user.is_email_confirmed {
            return Err(ConfirmationError::AlreadyConfirmed { field: "email" }.into());
        }

        let code = Uuid::new_v4().to_string();
        let user = set_confirmation_code(user, code.clone(), self.code_expiry());
        self.users.store(&user).await?;

        dispatch(
            self.email_sender.clone(),
            AccountEmail::Confirmation,
            user.email,
            code,
        );

        Ok(())
    }

    /// 密码找回：生成找回码并发送邮件
    pub async fn password_recovery(&self, email: &str) -> Result<(), AppError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(ConfirmationError::UserNotFound { field: "email" })?;

        let code = Uuid::new_v4().to_string();
        let user = set_recovery_code(user, code.clone(), self.code_expiry());
        self.users.store(&user).await?;

        tracing::info!(user_id = %user.id, "Password recovery requested");
        dispatch(
            self.email_sender.clone(),
            AccountEmail::PasswordRecovery,
            user.email,
            code,
        );

        Ok(())
    }

    /// 使用找回码设置新密码，并终止该用户所有会话
    pub async fn new_password(
        &self,
        new_password: &str,
        recovery_code: &str,
    ) -> Result<(), AppError> {
        let user = self
            .users
            .find_by_recovery_code(recovery_code)
            .await?
            .ok_or(ConfirmationError::InvalidCode {
                field: "recoveryCode",
            })?;

        if user.recovery_expired(Utc::now()) {
            return Err(ConfirmationError::CodeExpired {
                field: "recoveryCode",
            }
            .into());
        }

        let password_hash = self.hasher.hash(new_password)?;
        let user = change_password(user, password_hash);
        self.users.store(&user).await?;

        let revoked = self.sessions.delete_all_for_user(user.id).await?;
        tracing::info!(user_id = %user.id, revoked_sessions = revoked, "Password changed");
        Ok(())
    }
}
