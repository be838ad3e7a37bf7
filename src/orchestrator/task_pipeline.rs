//! 单个任务流水线 - 编排层
//!
//! ## 职责
//!
//! 本模块负责单个任务从详情到提交的完整流水线：
//!
//! 1. **拉取详情**：通过平台客户端获取任务详情
//! 2. **生成作答**：委托 submission_builder 构建提交载荷
//! 3. **模拟作答时长**：提交前按策略等待一段随机时间
//! 4. **提交作答**：调用平台客户端提交
//! 5. **产出结果**：无论成败都产出一条 TaskResult
//!
//! 任一环节失败都在本地捕获并记为失败结果，绝不向同批的其他任务扩散

use crate::clients::TaskApi;
use crate::models::{ErrorKind, SubmissionPolicy, Task, TaskResult};
use crate::services::submission_builder::{build_payload, format_timestamp};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};

/// 提交前实际等待的上限（秒）
///
/// 分钟档位是给调用方的"模拟作答时长"表盘，真实等待始终钳制在这个值以内
pub const MAX_PACING_SECS: u64 = 10;

/// 处理单个任务
///
/// # 参数
/// - `api`: 平台接口
/// - `task`: 任务
/// - `policy`: 提交策略
/// - `task_index`: 任务序号（仅用于日志）
///
/// # 返回
/// 恰好一条处理结果，失败也不例外
pub async fn process_task(
    api: &dyn TaskApi,
    task: &Task,
    policy: &SubmissionPolicy,
    task_index: usize,
) -> TaskResult {
    let title = task.display_title();
    log_task_start(task_index, &task.id, &title);

    // ========== 拉取任务详情（列表里已带详情时直接复用） ==========
    let detail = match &task.raw_detail {
        Some(detail) => detail.clone(),
        None => match api.fetch_task_detail(&task.id).await {
            Ok(detail) => detail,
            Err(e) => {
                error!("[任务 {}] ❌ 详情拉取失败: {}", task_index, e);
                return TaskResult::failed(
                    task.id.clone(),
                    title,
                    ErrorKind::Fetch,
                    e.to_string(),
                    format_timestamp(Utc::now()),
                );
            }
        },
    };

    // ========== 生成作答载荷 ==========
    let mut rng = StdRng::from_entropy();
    let payload = build_payload(&detail, policy, &mut rng, Utc::now());

    info!(
        "[任务 {}] 📝 已生成 {} 道题的作答",
        task_index,
        payload.answers.len()
    );

    // ========== 模拟作答时长 ==========
    let delay = pacing_delay(policy, &mut rng);
    if !delay.is_zero() {
        info!("[任务 {}] ⏳ 模拟作答 {} 秒...", task_index, delay.as_secs());
        sleep(delay).await;
    }

    // ========== 提交 ==========
    match api.submit_task(&task.id, &payload).await {
        Ok(response) => {
            info!("[任务 {}] ✓ 提交成功", task_index);
            TaskResult::succeeded(task.id.clone(), title, response, format_timestamp(Utc::now()))
        }
        Err(e) => {
            error!("[任务 {}] ❌ 提交失败: {}", task_index, e);
            TaskResult::failed(
                task.id.clone(),
                title,
                ErrorKind::Submit,
                e.to_string(),
                format_timestamp(Utc::now()),
            )
        }
    }
}

/// 计算提交前的模拟作答时长
///
/// 在 [下限分钟·60, 上限分钟·60] 内均匀抽一个秒数，
/// 再钳制到 [`MAX_PACING_SECS`] 以内
pub fn pacing_delay(policy: &SubmissionPolicy, rng: &mut impl Rng) -> Duration {
    let min_secs = policy.min_delay_minutes * 60;
    let max_secs = (policy.max_delay_minutes * 60).max(min_secs);

    let drawn = rng.gen_range(min_secs..=max_secs);
    Duration::from_secs(drawn.min(MAX_PACING_SECS))
}

// ========== 日志辅助函数 ==========

fn log_task_start(task_index: usize, task_id: &str, title: &str) {
    info!("\n[任务 {}] {}", task_index, "─".repeat(30));
    info!("[任务 {}] 开始处理: {}", task_index, title);
    info!("[任务 {}] ID: {}", task_index, task_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::TaskDetail;
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 只统计调用次数的接口桩
    struct CountingApi {
        fetch_calls: AtomicUsize,
        submit_calls: AtomicUsize,
    }

    impl CountingApi {
        fn new() -> Self {
            Self {
                fetch_calls: AtomicUsize::new(0),
                submit_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TaskApi for CountingApi {
        async fn fetch_task_detail(&self, _task_id: &str) -> crate::error::AppResult<TaskDetail> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            Ok(TaskDetail::from_value(json!({"questions": []})))
        }

        async fn submit_task(
            &self,
            _task_id: &str,
            _payload: &crate::models::SubmissionPayload,
        ) -> crate::error::AppResult<Value> {
            self.submit_calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"status": "ok"}))
        }
    }

    /// 提交必失败的接口桩
    struct FailingSubmitApi;

    #[async_trait]
    impl TaskApi for FailingSubmitApi {
        async fn fetch_task_detail(&self, _task_id: &str) -> crate::error::AppResult<TaskDetail> {
            Ok(TaskDetail::from_value(json!({"questions": []})))
        }

        async fn submit_task(
            &self,
            _task_id: &str,
            _payload: &crate::models::SubmissionPayload,
        ) -> crate::error::AppResult<Value> {
            Err(AppError::Other("平台拒绝".to_string()))
        }
    }

    fn instant_policy() -> SubmissionPolicy {
        SubmissionPolicy {
            min_delay_minutes: 0,
            max_delay_minutes: 0,
            ..SubmissionPolicy::default()
        }
    }

    fn task_with_detail(detail: Option<TaskDetail>) -> Task {
        Task {
            id: "t1".to_string(),
            title: Some("任务一".to_string()),
            subject: None,
            raw_detail: detail,
        }
    }

    #[tokio::test]
    async fn test_process_task_reuses_embedded_detail() {
        let api = CountingApi::new();
        let detail = TaskDetail::from_value(json!({
            "questions": [{"id": "q1", "type": "cloud", "options": {"ids": []}}]
        }));

        let result =
            process_task(&api, &task_with_detail(Some(detail)), &instant_policy(), 1).await;

        assert!(result.success);
        assert_eq!(api.fetch_calls.load(Ordering::SeqCst), 0, "已带详情时不应再拉取");
        assert_eq!(api.submit_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_process_task_fetches_when_detail_missing() {
        let api = CountingApi::new();

        let result = process_task(&api, &task_with_detail(None), &instant_policy(), 1).await;

        assert!(result.success);
        assert_eq!(api.fetch_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_process_task_submit_failure_becomes_result() {
        let result = process_task(
            &FailingSubmitApi,
            &task_with_detail(None),
            &instant_policy(),
            1,
        )
        .await;

        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::Submit));
        assert_eq!(result.task_title, "任务一");
    }

    fn policy(min_minutes: u64, max_minutes: u64) -> SubmissionPolicy {
        SubmissionPolicy {
            min_delay_minutes: min_minutes,
            max_delay_minutes: max_minutes,
            ..SubmissionPolicy::default()
        }
    }

    #[test]
    fn test_pacing_delay_clamped_to_max() {
        let mut rng = StdRng::seed_from_u64(5);

        // 即使档位拉满，实际等待也不超过上限
        for _ in 0..100 {
            let delay = pacing_delay(&policy(100, 200), &mut rng);
            assert!(delay <= Duration::from_secs(MAX_PACING_SECS));
        }
    }

    #[test]
    fn test_pacing_delay_zero_policy() {
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(pacing_delay(&policy(0, 0), &mut rng), Duration::ZERO);
    }

    #[test]
    fn test_pacing_delay_tolerates_inverted_bounds() {
        let mut rng = StdRng::seed_from_u64(5);
        // 上限小于下限时取下限
        for _ in 0..20 {
            let delay = pacing_delay(&policy(3, 1), &mut rng);
            assert!(delay <= Duration::from_secs(MAX_PACING_SECS));
        }
    }
}
