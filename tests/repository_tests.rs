//! 仓库层集成测试
//!
//! 测试 PostgreSQL 数据访问层（需要数据库连接，默认忽略）
//! 运行: TEST_DATABASE_URL=... cargo test --test repository_tests -- --ignored

mod common;

use blog_platform::{
    db,
    models::{
        session::Session,
        user::{confirm_email, make_deleted, SortDirection, User, UsersQuery, UsersSortBy},
    },
    repository::{PgSessionRepository, PgUserRepository, SessionRepository, UserRepository},
};
use chrono::{Duration, Utc};
use serial_test::serial;
use sqlx::PgPool;
use uuid::Uuid;

async fn setup_pool() -> PgPool {
    let config = common::create_test_config();
    let pool = db::create_pool(&config.database)
        .await
        .expect("Failed to create test database pool");
    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    sqlx::query("DELETE FROM sessions").execute(&pool).await.unwrap();
    sqlx::query("DELETE FROM users").execute(&pool).await.unwrap();
    pool
}

fn pending_user(login: &str) -> User {
    User::new_unconfirmed(
        login,
        &format!("{}@example.com", login),
        "hash".to_string(),
        Uuid::new_v4().to_string(),
        Utc::now() + Duration::hours(1),
    )
}

#[tokio::test]
#[ignore = "需要数据库连接"]
#[serial]
async fn test_user_store_is_an_upsert() {
    let pool = setup_pool().await;
    let repo = PgUserRepository::new(pool);
    let user = pending_user("alice");

    repo.store(&user).await.unwrap();
    let code = user.confirmation_code.clone().unwrap();
    repo.store(&confirm_email(user.clone())).await.unwrap();

    let loaded = repo.find_by_id(user.id).await.unwrap().unwrap();
    assert!(loaded.is_email_confirmed);
    assert!(loaded.confirmation_code.is_none());
    assert_eq!(loaded.confirmed_with_code.as_deref(), Some(code.as_str()));

    let by_code = repo.find_by_confirmation_code(&code).await.unwrap();
    assert_eq!(by_code.map(|u| u.id), Some(user.id));
}

#[tokio::test]
#[ignore = "需要数据库连接"]
#[serial]
async fn test_soft_deleted_user_hidden_from_lookups() {
    let pool = setup_pool().await;
    let repo = PgUserRepository::new(pool);
    let user = pending_user("bob");
    repo.store(&make_deleted(user.clone())).await.unwrap();

    assert!(repo.find_by_id(user.id).await.unwrap().is_none());
    assert!(repo.find_by_login("bob").await.unwrap().is_none());
    assert!(repo.find_by_email("bob@example.com").await.unwrap().is_none());
    assert!(repo.login_exists("bob").await.unwrap());
    assert!(repo.email_exists("bob@example.com").await.unwrap());
}

#[tokio::test]
#[ignore = "需要数据库连接"]
#[serial]
async fn test_session_repository_contract() {
    let pool = setup_pool().await;
    let users = PgUserRepository::new(pool.clone());
    let sessions = PgSessionRepository::new(pool);
    let owner = pending_user("carol");
    let other = pending_user("dave");
    users.store(&owner).await.unwrap();
    users.store(&other).await.unwrap();

    for device in ["c1", "c2", "c3"] {
        sessions
            .insert(&Session::new(owner.id, device, "10.0.0.1", "ua"))
            .await
            .unwrap();
    }
    sessions
        .insert(&Session::new(other.id, "d1", "10.0.0.2", "ua"))
        .await
        .unwrap();

    assert!(sessions
        .update_last_active("c1", Utc::now() + Duration::seconds(5))
        .await
        .unwrap());
    let listed = sessions.list_for_user(owner.id).await.unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[0].device_id, "c1");

    assert!(!sessions.delete_for_user(owner.id, "d1").await.unwrap());
    assert_eq!(sessions.delete_all_for_user_except(owner.id, "c1").await.unwrap(), 2);
    assert!(sessions.delete_by_device_id("c1").await.unwrap());
    assert!(!sessions.delete_by_device_id("c1").await.unwrap());
    assert!(sessions.find_by_device_id("d1").await.unwrap().is_some());

    assert_eq!(sessions.delete_all().await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "需要数据库连接"]
#[serial]
async fn test_user_find_page_filters_and_escapes_terms() {
    let pool = setup_pool().await;
    let repo = PgUserRepository::new(pool);
    for login in ["ann_1", "annx1", "bob"] {
        repo.store(&pending_user(login)).await.unwrap();
    }
    repo.store(&make_deleted(pending_user("ann_2"))).await.unwrap();

    let query = UsersQuery {
        sort_by: UsersSortBy::Login,
        sort_direction: SortDirection::Asc,
        search_login_term: Some("N_".to_string()),
        ..UsersQuery::default()
    };
    let (users, total) = repo.find_page(&query).await.unwrap();

    // "_" 按字面匹配，不是通配符
    assert_eq!(total, 1);
    assert_eq!(users[0].login, "ann_1");

    let (all, total) = repo.find_page(&UsersQuery::default()).await.unwrap();
    assert_eq!(total, 3);
    assert_eq!(all.len(), 3);
}
