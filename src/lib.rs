//! Faceflow - Rust 人脸比对会话编排器
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 会话状态快照与编排器（单飞行、就绪镜像、槽位规则）
//! - **net**: compare 前的连通性预检
//! - **observability**: tracing 日志初始化
//! - **provider**: 人脸能力抽象（捕获 / 比对 / 就绪）与 Remote / Mock 实现、启动期后端选择

pub mod config;
pub mod core;
pub mod net;
pub mod observability;
pub mod provider;
