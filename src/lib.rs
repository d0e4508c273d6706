//! 博客平台账号与会话后端
//! 注册、邮箱确认、JWT 登录、设备会话管理

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;
pub mod telemetry;
