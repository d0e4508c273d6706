//! Session repository (设备会话数据访问)

use super::SessionRepository;
use crate::{error::AppError, models::session::Session};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgSessionRepository {
    db: PgPool,
}

impl PgSessionRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    /// 新建会话
    async fn insert(&self, session: &Session) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (device_id, user_id, ip, title, last_active_date, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&session.device_id)
        .bind(session.user_id)
        .bind(&session.ip)
        .bind(&session.title)
        .bind(session.last_active_date)
        .bind(session.created_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn find_by_device_id(&self, device_id: &str) -> Result<Option<Session>, AppError> {
        let session = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE device_id = $1")
            .bind(device_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(session)
    }

    /// 更新最后活跃时间
    async fn update_last_active(
        &self,
        device_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE sessions SET last_active_date = $2 WHERE device_id = $1")
            .bind(device_id)
            .bind(at)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_device_id(&self, device_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE device_id = $1")
            .bind(device_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Session>, AppError> {
        let sessions = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE user_id = $1 ORDER BY last_active_date DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(sessions)
    }

    /// 按用户范围删除单个会话（归属校验在 WHERE 中完成）
    async fn delete_for_user(&self, user_id: Uuid, device_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE device_id = $1 AND user_id = $2")
            .bind(device_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_all_for_user_except(
        &self,
        user_id: Uuid,
        except_device_id: &str,
    ) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND device_id <> $2")
            .bind(user_id)
            .bind(except_device_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_all(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions").execute(&self.db).await?;

        Ok(result.rows_affected())
    }
}
