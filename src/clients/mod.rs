//! 外部平台客户端
//!
//! 核心处理管线只依赖 [`TaskApi`] 这个契约，不关心具体实现；
//! [`EduspClient`] 是面向学习平台 HTTP 接口的真实实现。

pub mod edusp_client;

pub use edusp_client::EduspClient;

use crate::error::AppResult;
use crate::models::{SubmissionPayload, TaskDetail};
use async_trait::async_trait;
use serde_json::Value;

/// 核心处理管线依赖的平台接口契约
///
/// 两个调用都假定可安全重试，但核心自身不做自动重试：
/// 任一调用失败即终止该任务的流水线（记为失败结果），不影响其他任务
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// 拉取任务详情
    async fn fetch_task_detail(&self, task_id: &str) -> AppResult<TaskDetail>;

    /// 提交任务作答
    async fn submit_task(&self, task_id: &str, payload: &SubmissionPayload) -> AppResult<Value>;
}
