//! User repository (数据库访问层)

use super::UserRepository;
use crate::{
    error::AppError,
    models::user::{SortDirection, User, UsersQuery},
};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn find_active_by(&self, column: &str, value: &str) -> Result<Option<User>, AppError> {
        let sql = format!(
            "SELECT * FROM users WHERE {} = $1 AND deletion_status <> 'permanent_deleted'",
            column
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    async fn exists_by(&self, column: &str, value: &str) -> Result<bool, AppError> {
        let sql = format!("SELECT EXISTS (SELECT 1 FROM users WHERE {} = $1)", column);
        let exists: bool = sqlx::query(&sql)
            .bind(value)
            .fetch_one(&self.db)
            .await?
            .get(0);

        Ok(exists)
    }
}

/// `ILIKE '%term%'` pattern with LIKE wildcards in the term escaped
fn like_pattern(term: &Option<String>) -> Option<String> {
    term.as_deref().map(|t| {
        let escaped = t
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        format!("%{}%", escaped)
    })
}

// 无搜索词时匹配全部，否则登录名或邮箱任一匹配
const PAGE_FILTER: &str = r#"
    deletion_status <> 'permanent_deleted'
    AND (
        ($1::text IS NULL AND $2::text IS NULL)
        OR login ILIKE $1
        OR email ILIKE $2
    )
"#;

#[async_trait]
impl UserRepository for PgUserRepository {
    /// 根据 ID 查找用户
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE id = $1 AND deletion_status <> 'permanent_deleted'",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    /// 根据登录名查找用户
    async fn find_by_login(&self, login: &str) -> Result<Option<User>, AppError> {
        self.find_active_by("login", login).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.find_active_by("email", email).await
    }

    /// 根据确认码查找用户（包括已用该码确认的用户）
    async fn find_by_confirmation_code(&self, code: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE (confirmation_code = $1 OR confirmed_with_code = $1)
                AND deletion_status <> 'permanent_deleted'
            LIMIT 1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    async fn find_by_recovery_code(&self, code: &str) -> Result<Option<User>, AppError> {
        self.find_active_by("recovery_code", code).await
    }

    async fn login_exists(&self, login: &str) -> Result<bool, AppError> {
        self.exists_by("login", login).await
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        self.exists_by("email", email).await
    }

    /// 分页查询用户（排序列来自枚举，不拼接用户输入）
    async fn find_page(&self, query: &UsersQuery) -> Result<(Vec<User>, u64), AppError> {
        let login_pattern = like_pattern(&query.search_login_term);
        let email_pattern = like_pattern(&query.search_email_term);

        let total: i64 = sqlx::query(&format!("SELECT COUNT(*) FROM users WHERE {}", PAGE_FILTER))
            .bind(&login_pattern)
            .bind(&email_pattern)
            .fetch_one(&self.db)
            .await?
            .get(0);

        // 次要排序保证分页稳定
        let tie_break = match query.sort_direction {
            SortDirection::Asc => "id ASC",
            SortDirection::Desc => "id DESC",
        };
        let sql = format!(
            "SELECT * FROM users WHERE {} ORDER BY {} {}, {} LIMIT $3 OFFSET $4",
            PAGE_FILTER,
            query.sort_by.column(),
            query.sort_direction.as_sql(),
            tie_break
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(&login_pattern)
            .bind(&email_pattern)
            .bind(i64::try_from(query.page_size).unwrap_or(i64::MAX))
            .bind(i64::try_from(query.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.db)
            .await?;

        Ok((users, u64::try_from(total).unwrap_or_default()))
    }

    /// 保存用户（按 id 插入或覆盖）
    async fn store(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, login, email, password_hash,
                is_email_confirmed, confirmation_code, confirmation_code_expiration, confirmed_with_code,
                recovery_code, recovery_code_expiration,
                deletion_status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE SET
                login = EXCLUDED.login,
                email = EXCLUDED.email,
                password_hash = EXCLUDED.password_hash,
                is_email_confirmed = EXCLUDED.is_email_confirmed,
                confirmation_code = EXCLUDED.confirmation_code,
                confirmation_code_expiration = EXCLUDED.confirmation_code_expiration,
                confirmed_with_code = EXCLUDED.confirmed_with_code,
                recovery_code = EXCLUDED.recovery_code,
                recovery_code_expiration = EXCLUDED.recovery_code_expiration,
                deletion_status = EXCLUDED.deletion_status,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user.id)
        .bind(&user.login)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.is_email_confirmed)
        .bind(&user.confirmation_code)
        .bind(user.confirmation_code_expiration)
        .bind(&user.confirmed_with_code)
        .bind(&user.recovery_code)
        .bind(user.recovery_code_expiration)
        .bind(user.deletion_status.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// 清空用户表（测试重置）
    async fn delete_all(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM users").execute(&self.db).await?;

        Ok(result.rows_affected())
    }
}
