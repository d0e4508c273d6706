//! User domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Soft-deletion state of an account
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeletionStatus {
    Active,
    PermanentDeleted,
}

impl DeletionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeletionStatus::Active => "active",
            DeletionStatus::PermanentDeleted => "permanent_deleted",
        }
    }
}

impl TryFrom<String> for DeletionStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "active" => Ok(DeletionStatus::Active),
            "permanent_deleted" => Ok(DeletionStatus::PermanentDeleted),
            other => Err(format!("unknown deletion status: {}", other)),
        }
    }
}

/// User account
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub login: String,
    pub email: String,
    pub password_hash: String,

    // Email confirmation
    pub is_email_confirmed: bool,
    pub confirmation_code: Option<String>,
    pub confirmation_code_expiration: Option<DateTime<Utc>>,
    pub confirmed_with_code: Option<String>,

    // Password recovery
    pub recovery_code: Option<String>,
    pub recovery_code_expiration: Option<DateTime<Utc>>,

    #[sqlx(try_from = "String")]
    pub deletion_status: DeletionStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build an unconfirmed user awaiting `code` until `expires_at`
    pub fn new_unconfirmed(
        login: &str,
        email: &str,
        password_hash: String,
        code: String,
        expires_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            login: login.to_string(),
            email: email.to_string(),
            password_hash,
            is_email_confirmed: false,
            confirmation_code: Some(code),
            confirmation_code_expiration: Some(expires_at),
            confirmed_with_code: None,
            recovery_code: None,
            recovery_code_expiration: None,
            deletion_status: DeletionStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deletion_status == DeletionStatus::PermanentDeleted
    }

    /// The pending confirmation code has passed its expiry
    pub fn confirmation_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.confirmation_code_expiration, Some(exp) if exp < now)
    }

    pub fn recovery_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.recovery_code_expiration, Some(exp) if exp < now)
    }
}

/// Mark the email confirmed and retire the pending code.
pub fn confirm_email(mut user: User) -> User {
    user.is_email_confirmed = true;
    user.confirmed_with_code = user.confirmation_code.take();
    user.confirmation_code_expiration = None;
    user.updated_at = Utc::now();
    user
}

pub fn set_confirmation_code(mut user: User, code: String, expires_at: DateTime<Utc>) -> User {
    user.confirmation_code = Some(code);
    user.confirmation_code_expiration = Some(expires_at);
    user.updated_at = Utc::now();
    user
}

pub fn set_recovery_code(mut user: User, code: String, expires_at: DateTime<Utc>) -> User {
    user.recovery_code = Some(code);
    user.recovery_code_expiration = Some(expires_at);
    user.updated_at = Utc::now();
    user
}

/// Replace the password hash; the recovery code is single use.
pub fn change_password(mut user: User, password_hash: String) -> User {
    user.password_hash = password_hash;
    user.recovery_code = None;
    user.recovery_code_expiration = None;
    user.updated_at = Utc::now();
    user
}

pub fn make_deleted(mut user: User) -> User {
    user.deletion_status = DeletionStatus::PermanentDeleted;
    user.updated_at = Utc::now();
    user
}

/// Identity returned by the credential check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: Uuid,
    pub login: String,
}

impl From<&User> for UserIdentity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            login: user.login.clone(),
        }
    }
}

/// `GET /auth/me` view
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MeView {
    pub email: String,
    pub login: String,
    pub user_id: Uuid,
}

impl From<User> for MeView {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            login: user.login,
            user_id: user.id,
        }
    }
}

/// `GET /auth/me-or-default` view; anonymous callers get nulls
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MeOrDefaultView {
    pub email: Option<String>,
    pub login: String,
    pub user_id: Option<Uuid>,
}

impl MeOrDefaultView {
    pub const ANONYMOUS_LOGIN: &'static str = "anonymous";

    pub fn anonymous() -> Self {
        Self {
            email: None,
            login: Self::ANONYMOUS_LOGIN.to_string(),
            user_id: None,
        }
    }
}

impl From<MeView> for MeOrDefaultView {
    fn from(me: MeView) -> Self {
        Self {
            email: Some(me.email),
            login: me.login,
            user_id: Some(me.user_id),
        }
    }
}

/// Admin view of a user
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub login: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            login: user.login,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UsersSortBy {
    #[default]
    CreatedAt,
    Login,
    Email,
}

impl UsersSortBy {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "createdAt" => Some(UsersSortBy::CreatedAt),
            "login" => Some(UsersSortBy::Login),
            "email" => Some(UsersSortBy::Email),
            _ => None,
        }
    }

    /// Column name in the `users` table
    pub fn column(&self) -> &'static str {
        match self {
            UsersSortBy::CreatedAt => "created_at",
            UsersSortBy::Login => "login",
            UsersSortBy::Email => "email",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Raw `GET /users` query string; unknown or malformed values fall back to defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersQueryParams {
    pub sort_by: Option<String>,
    pub sort_direction: Option<String>,
    pub page_number: Option<String>,
    pub page_size: Option<String>,
    pub search_login_term: Option<String>,
    pub search_email_term: Option<String>,
}

/// Normalized user listing query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsersQuery {
    pub sort_by: UsersSortBy,
    pub sort_direction: SortDirection,
    /// 1-based
    pub page_number: u64,
    pub page_size: u64,
    /// Case-insensitive substring terms, combined with OR
    pub search_login_term: Option<String>,
    pub search_email_term: Option<String>,
}

impl Default for UsersQuery {
    fn default() -> Self {
        Self {
            sort_by: UsersSortBy::default(),
            sort_direction: SortDirection::default(),
            page_number: 1,
            page_size: DEFAULT_PAGE_SIZE,
            search_login_term: None,
            search_email_term: None,
        }
    }
}

impl UsersQuery {
    pub fn offset(&self) -> u64 {
        (self.page_number - 1).saturating_mul(self.page_size)
    }

    /// Does `user` match the search terms (no terms matches everyone)
    pub fn matches(&self, user: &User) -> bool {
        let contains = |haystack: &str, needle: &Option<String>| {
            needle
                .as_deref()
                .is_some_and(|n| haystack.to_lowercase().contains(&n.to_lowercase()))
        };

        if self.search_login_term.is_none() && self.search_email_term.is_none() {
            return true;
        }
        contains(&user.login, &self.search_login_term)
            || contains(&user.email, &self.search_email_term)
    }
}

impl From<UsersQueryParams> for UsersQuery {
    fn from(params: UsersQueryParams) -> Self {
        let positive = |value: Option<String>| {
            value
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|v| *v > 0)
        };
        let term = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            sort_by: params
                .sort_by
                .as_deref()
                .and_then(UsersSortBy::parse)
                .unwrap_or_default(),
            sort_direction: params
                .sort_direction
                .as_deref()
                .and_then(SortDirection::parse)
                .unwrap_or_default(),
            page_number: positive(params.page_number).unwrap_or(1),
            page_size: positive(params.page_size)
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .min(MAX_PAGE_SIZE),
            search_login_term: term(params.search_login_term),
            search_email_term: term(params.search_email_term),
        }
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub pages_count: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_count: u64,
    pub items: Vec<T>,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total_count: u64, query: &UsersQuery) -> Self {
        Self {
            pages_count: total_count.div_ceil(query.page_size),
            page: query.page_number,
            page_size: query.page_size,
            total_count,
            items,
        }
    }
}
