//! 设备会话服务

use crate::{error::AppError, models::session::Session, repository::SessionRepository};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub struct SessionService {
    sessions: Arc<dyn SessionRepository>,
}

impl SessionService {
    pub fn new(sessions: Arc<dyn SessionRepository>) -> Self {
        Self { sessions }
    }

    /// 登录时创建会话
    pub async fn create(
        &self,
        user_id: Uuid,
        device_id: &str,
        ip: &str,
        title: &str,
    ) -> Result<Session, AppError> {
        let session = Session::new(user_id, device_id, ip, title);
        self.sessions.insert(&session).await?;

        tracing::info!(user_id = %user_id, device_id = %device_id, ip = %ip, "Session created");
        Ok(session)
    }

    pub async fn find_by_device_id(&self, device_id: &str) -> Result<Option<Session>, AppError> {
        self.sessions.find_by_device_id(device_id).await
    }

    /// 刷新最后活跃时间
    pub async fn touch(&self, device_id: &str) -> Result<(), AppError> {
        if !self.sessions.update_last_active(device_id, Utc::now()).await? {
            tracing::debug!(device_id = %device_id, "Touched a session that no longer exists");
        }
        Ok(())
    }

    /// 删除会话（幂等）
    pub async fn delete_by_device_id(&self, device_id: &str) -> Result<bool, AppError> {
        let removed = self.sessions.delete_by_device_id(device_id).await?;
        if removed {
            tracing::info!(device_id = %device_id, "Session revoked");
        }
        Ok(removed)
    }

    /// 按最后活跃时间倒序
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Session>, AppError> {
        self.sessions.list_for_user(user_id).await
    }

    /// 终止除当前设备外的所有会话
    pub async fn delete_all_other_sessions(
        &self,
        user_id: Uuid,
        except_device_id: &str,
    ) -> Result<u64, AppError> {
        let removed = self
            .sessions
            .delete_all_for_user_except(user_id, except_device_id)
            .await?;

        tracing::info!(
            user_id = %user_id,
            kept_device_id = %except_device_id,
            removed = removed,
            "Other sessions revoked"
        );
        Ok(removed)
    }

    /// 终止指定设备；不属于该用户的设备与不存在的设备一样报 NotFound
    pub async fn delete_specific_session(
        &self,
        user_id: Uuid,
        device_id: &str,
    ) -> Result<(), AppError> {
        if !self.sessions.delete_for_user(user_id, device_id).await? {
            return Err(AppError::not_found("device"));
        }

        tracing::info!(user_id = %user_id, device_id = %device_id, "Session revoked");
        Ok(())
    }

    pub async fn delete_all_for_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        self.sessions.delete_all_for_user(user_id).await
    }

    pub async fn delete_all(&self) -> Result<u64, AppError> {
        self.sessions.delete_all().await
    }
}
