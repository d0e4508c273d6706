//! 数据模型模块
//! 用户、设备会话与认证请求模型

pub mod auth;
pub mod session;
pub mod user;
