//! # Auto Task Submit
//!
//! 一个用于自动化完成学习平台任务的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的分层架构：
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 面向学习平台 HTTP 接口的真实实现
//! - `TaskApi` - 核心管线依赖的唯一契约（详情拉取 + 作答提交）
//! - 接口返回的形状差异在这一层规整，核心从不按响应形状分支
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个对象
//! - `answer_synthesizer` - 按题型合成作答值
//! - `submission_builder` - 把任务详情变成提交载荷
//! - `account_store` - 已保存账号的增删查
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量任务处理器，管理并发、节流和进度
//! - `orchestrator/task_pipeline` - 单个任务流水线（详情 → 作答 → 暂停 → 提交）
//!
//! ### ④ 应用层（App）
//! - `app` - 登录、任务拉取、批量处理的组装流程
//!
//! ## 模块结构

pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use app::App;
pub use clients::{EduspClient, TaskApi};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{
    ProcessingProgress, Question, SubmissionPayload, SubmissionPolicy, Task, TaskDetail,
    TaskResult,
};
pub use orchestrator::{BatchProcessor, ProgressCallback};
pub use services::{build_payload, synthesize_answer, AccountStore};
