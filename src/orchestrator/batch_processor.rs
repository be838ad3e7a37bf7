//! 批量任务处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块负责批量任务的处理和进度管理。
//!
//! ## 核心功能
//!
//! 1. **单飞控制**：同一实例同时只允许一次运行，重入立即报错
//! 2. **分批处理**：任务按固定批量切分，每批并发、批间串行
//! 3. **并发控制**：使用 Semaphore 限制并发数量
//! 4. **节流**：批与批之间固定暂停，避免冲击远端接口
//! 5. **失败隔离**：单个任务失败只记为失败结果，不影响同批与后续批次
//! 6. **进度汇报**：每个任务结算后更新进度并通知观察者
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单个任务的细节，向下委托 task_pipeline
//! - **状态独占**：进度和结果序列只由当前运行修改
//! - **必定归位**：无论正常结束还是中途抛错，运行标志都会复位

use crate::clients::TaskApi;
use crate::error::{AppError, AppResult, ProcessorError};
use crate::models::{ErrorKind, ProcessingProgress, SubmissionPolicy, Task, TaskResult};
use crate::orchestrator::task_pipeline;
use crate::services::submission_builder::format_timestamp;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{error, info};

/// 进度观察者回调，每个任务结算后收到一次快照
pub type ProgressCallback = Arc<dyn Fn(ProcessingProgress) + Send + Sync>;

/// 默认每批任务数
pub const DEFAULT_BATCH_SIZE: usize = 3;

/// 默认批间暂停
pub const DEFAULT_INTER_BATCH_PAUSE: Duration = Duration::from_secs(1);

/// 批量任务处理器
///
/// 多个实例彼此独立；单个实例内同时只允许一次运行
pub struct BatchProcessor {
    api: Arc<dyn TaskApi>,
    batch_size: usize,
    inter_batch_pause: Duration,
    running: AtomicBool,
    progress: Arc<Mutex<ProcessingProgress>>,
}

impl BatchProcessor {
    /// 创建新的批量处理器
    pub fn new(api: Arc<dyn TaskApi>) -> Self {
        Self {
            api,
            batch_size: DEFAULT_BATCH_SIZE,
            inter_batch_pause: DEFAULT_INTER_BATCH_PAUSE,
            running: AtomicBool::new(false),
            progress: Arc::new(Mutex::new(ProcessingProgress::default())),
        }
    }

    /// 设置每批任务数（至少为 1）
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// 设置批间暂停时长
    pub fn with_inter_batch_pause(mut self, pause: Duration) -> Self {
        self.inter_batch_pause = pause;
        self
    }

    /// 当前进度快照
    pub fn progress(&self) -> ProcessingProgress {
        *self.progress.lock().unwrap()
    }

    /// 批量处理任务
    ///
    /// # 参数
    /// - `tasks`: 待处理任务列表
    /// - `policy`: 本次运行的提交策略
    /// - `on_progress`: 可选的进度观察者
    ///
    /// # 返回
    /// 每个输入任务恰好一条结果，顺序跟随任务提交顺序；
    /// 已有运行在进行时立即返回 `AlreadyRunning`，不影响在途运行
    pub async fn run(
        &self,
        tasks: &[Task],
        policy: &SubmissionPolicy,
        on_progress: Option<ProgressCallback>,
    ) -> AppResult<Vec<TaskResult>> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(AppError::Processor(ProcessorError::AlreadyRunning));
        }
        // 无论下面哪条路径退出，运行标志都随 guard 复位
        let _guard = RunningGuard(&self.running);

        let total = tasks.len();
        *self.progress.lock().unwrap() = ProcessingProgress::new(total);

        let total_batches = (total + self.batch_size - 1) / self.batch_size;
        log_run_start(total, self.batch_size);

        let semaphore = Arc::new(Semaphore::new(self.batch_size));
        let mut results = Vec::with_capacity(total);

        for (batch_num, batch) in tasks.chunks(self.batch_size).enumerate() {
            log_batch_start(batch_num + 1, total_batches, batch.len());

            // 为本批创建并发任务
            let mut metas = Vec::new();
            let mut handles = Vec::new();
            for (offset, task) in batch.iter().enumerate() {
                let task_index = batch_num * self.batch_size + offset + 1;
                let permit = semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|e| AppError::Other(e.to_string()))?;

                let api = self.api.clone();
                let task_clone = task.clone();
                let policy_clone = policy.clone();
                let progress = self.progress.clone();
                let callback = on_progress.clone();

                let handle = tokio::spawn(async move {
                    let _permit = permit;
                    let result =
                        task_pipeline::process_task(api.as_ref(), &task_clone, &policy_clone, task_index)
                            .await;

                    // 结算后立即更新进度并通知观察者
                    let snapshot = {
                        let mut progress = progress.lock().unwrap();
                        if result.success {
                            progress.completed_count += 1;
                        } else {
                            progress.failed_count += 1;
                        }
                        *progress
                    };
                    if let Some(callback) = callback.as_deref() {
                        callback(snapshot);
                    }

                    result
                });
                metas.push((task.id.clone(), task.display_title()));
                handles.push(handle);
            }

            // 等待本批所有任务全部落定，按提交顺序收集结果
            let joined = futures::future::join_all(handles).await;

            let mut batch_success = 0usize;
            let mut batch_failed = 0usize;

            for ((task_id, task_title), outcome) in metas.into_iter().zip(joined) {
                match outcome {
                    Ok(result) => {
                        if result.success {
                            batch_success += 1;
                        } else {
                            batch_failed += 1;
                        }
                        results.push(result);
                    }
                    Err(e) => {
                        // 任务体外的意外错误（被中断等）也要占一条失败结果
                        error!("[任务 {}] 任务执行失败: {}", task_id, e);
                        batch_failed += 1;

                        let snapshot = {
                            let mut progress = self.progress.lock().unwrap();
                            progress.failed_count += 1;
                            *progress
                        };
                        if let Some(callback) = on_progress.as_deref() {
                            callback(snapshot);
                        }

                        results.push(TaskResult::failed(
                            task_id,
                            task_title,
                            ErrorKind::Internal,
                            e.to_string(),
                            format_timestamp(Utc::now()),
                        ));
                    }
                }
            }

            log_batch_complete(batch_num + 1, batch_success, batch_success + batch_failed);

            // 批与批之间固定暂停，最后一批之后不再等待
            if (batch_num + 1) * self.batch_size < total {
                sleep(self.inter_batch_pause).await;
            }
        }

        Ok(results)
    }
}

/// 运行标志复位守卫
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ========== 日志辅助函数 ==========

fn log_run_start(total: usize, batch_size: usize) {
    info!("{}", "=".repeat(60));
    info!("📦 开始批量处理 {} 个任务", total);
    info!("📋 将以每批 {} 个的方式处理", batch_size);
    info!("💡 每批完成后再开始下一批");
    info!("{}", "=".repeat(60));
}

fn log_batch_start(batch_num: usize, total_batches: usize, batch_len: usize) {
    info!("\n{}", "=".repeat(60));
    info!(
        "📦 开始处理第 {}/{} 批（本批 {} 个任务）",
        batch_num, total_batches, batch_len
    );
    info!("{}", "=".repeat(60));
}

fn log_batch_complete(batch_num: usize, success: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 第 {} 批完成: 成功 {}/{}", batch_num, success, total);
    info!("{}", "─".repeat(60));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::TaskApi;
    use crate::models::{SubmissionPayload, TaskDetail};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;

    /// 测试用的平台接口桩
    struct MockApi {
        fail_fetch: HashSet<String>,
        fail_submit: HashSet<String>,
        call_delay: Duration,
        in_flight: AtomicUsize,
        high_water: AtomicUsize,
    }

    impl MockApi {
        fn new() -> Self {
            Self {
                fail_fetch: HashSet::new(),
                fail_submit: HashSet::new(),
                call_delay: Duration::from_millis(20),
                in_flight: AtomicUsize::new(0),
                high_water: AtomicUsize::new(0),
            }
        }

        fn high_water(&self) -> usize {
            self.high_water.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TaskApi for MockApi {
        async fn fetch_task_detail(&self, task_id: &str) -> AppResult<TaskDetail> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.high_water.fetch_max(current, Ordering::SeqCst);

            sleep(self.call_delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_fetch.contains(task_id) {
                return Err(AppError::Other(format!("详情拉取失败: {}", task_id)));
            }

            Ok(TaskDetail::from_value(json!({
                "questions": [{"id": "q1", "type": "cloud", "options": {"ids": ["x"]}}]
            })))
        }

        async fn submit_task(
            &self,
            task_id: &str,
            _payload: &SubmissionPayload,
        ) -> AppResult<Value> {
            if self.fail_submit.contains(task_id) {
                return Err(AppError::Other(format!("提交失败: {}", task_id)));
            }
            Ok(json!({"status": "ok", "task": task_id}))
        }
    }

    fn make_tasks(count: usize) -> Vec<Task> {
        (1..=count)
            .map(|i| Task {
                id: format!("t{}", i),
                title: Some(format!("任务 {}", i)),
                subject: None,
                raw_detail: None,
            })
            .collect()
    }

    /// 不带模拟作答时长的策略，让测试跑得快
    fn instant_policy() -> SubmissionPolicy {
        SubmissionPolicy {
            min_delay_minutes: 0,
            max_delay_minutes: 0,
            ..SubmissionPolicy::default()
        }
    }

    #[tokio::test]
    async fn test_run_one_result_per_task_in_order() {
        let mut api = MockApi::new();
        api.fail_submit.insert("t3".to_string());

        let processor = BatchProcessor::new(Arc::new(api))
            .with_batch_size(3)
            .with_inter_batch_pause(Duration::ZERO);
        let tasks = make_tasks(5);

        let results = processor
            .run(&tasks, &instant_policy(), None)
            .await
            .expect("批量运行不应失败");

        assert_eq!(results.len(), 5, "每个任务恰好一条结果");
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.task_id, format!("t{}", i + 1), "结果顺序跟随提交顺序");
        }

        assert!(!results[2].success);
        assert_eq!(results[2].error_kind, Some(ErrorKind::Submit));
        assert!(results.iter().filter(|r| r.success).count() == 4);
    }

    #[tokio::test]
    async fn test_fetch_failure_isolated() {
        let mut api = MockApi::new();
        api.fail_fetch.insert("t1".to_string());

        let processor = BatchProcessor::new(Arc::new(api))
            .with_batch_size(3)
            .with_inter_batch_pause(Duration::ZERO);
        let tasks = make_tasks(3);

        let results = processor.run(&tasks, &instant_policy(), None).await.unwrap();

        assert!(!results[0].success);
        assert_eq!(results[0].error_kind, Some(ErrorKind::Fetch));
        // 同批的其他任务不受影响
        assert!(results[1].success);
        assert!(results[2].success);

        let progress = processor.progress();
        assert_eq!(progress.completed_count, 2);
        assert_eq!(progress.failed_count, 1);
    }

    #[tokio::test]
    async fn test_concurrency_capped_by_batch_size() {
        let api = Arc::new(MockApi::new());
        let processor = BatchProcessor::new(api.clone())
            .with_batch_size(3)
            .with_inter_batch_pause(Duration::ZERO);
        let tasks = make_tasks(7);

        let results = processor.run(&tasks, &instant_policy(), None).await.unwrap();

        assert_eq!(results.len(), 7);
        assert!(results.iter().all(|r| r.success));
        assert!(
            api.high_water() <= 3,
            "并发峰值 {} 超过批量上限",
            api.high_water()
        );
    }

    #[tokio::test]
    async fn test_progress_callback_per_settled_task() {
        let processor = BatchProcessor::new(Arc::new(MockApi::new()))
            .with_batch_size(2)
            .with_inter_batch_pause(Duration::ZERO);
        let tasks = make_tasks(5);

        let snapshots: Arc<Mutex<Vec<ProcessingProgress>>> = Arc::new(Mutex::new(Vec::new()));
        let snapshots_clone = snapshots.clone();
        let callback: ProgressCallback = Arc::new(move |p| {
            snapshots_clone.lock().unwrap().push(p);
        });

        processor
            .run(&tasks, &instant_policy(), Some(callback))
            .await
            .unwrap();

        let snapshots = snapshots.lock().unwrap();
        assert_eq!(snapshots.len(), 5, "每个任务结算都应通知观察者");
        assert!(snapshots.iter().all(|p| p.total == 5));
        assert_eq!(snapshots.last().unwrap().settled(), 5);
    }

    #[tokio::test]
    async fn test_rerun_while_running_fails_fast() {
        let mut api = MockApi::new();
        api.call_delay = Duration::from_millis(300);

        let processor = Arc::new(
            BatchProcessor::new(Arc::new(api))
                .with_batch_size(3)
                .with_inter_batch_pause(Duration::ZERO),
        );

        let first = {
            let processor = processor.clone();
            tokio::spawn(async move {
                let tasks = make_tasks(2);
                processor.run(&tasks, &instant_policy(), None).await
            })
        };

        // 等第一次运行真正进入 Running
        sleep(Duration::from_millis(50)).await;

        let second = processor.run(&make_tasks(9), &instant_policy(), None).await;
        match second {
            Err(AppError::Processor(ProcessorError::AlreadyRunning)) => {}
            other => panic!("重入应立即失败，实际得到 {:?}", other.map(|r| r.len())),
        }

        // 重入失败不应动到在途运行的进度
        assert_eq!(processor.progress().total, 2);

        let results = first.await.unwrap().unwrap();
        assert_eq!(results.len(), 2);

        // 运行结束后回到 Idle，可以再次运行
        let again = processor.run(&make_tasks(1), &instant_policy(), None).await;
        assert!(again.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_inter_batch_pause_between_batches_only() {
        let mut api = MockApi::new();
        api.call_delay = Duration::ZERO;

        let processor = BatchProcessor::new(Arc::new(api)).with_batch_size(3);
        let tasks = make_tasks(7);

        let started = tokio::time::Instant::now();
        let results = processor.run(&tasks, &instant_policy(), None).await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(results.len(), 7);
        // 3 批只有 2 次批间暂停（最后一批之后没有）
        assert!(
            elapsed >= Duration::from_secs(2) && elapsed < Duration::from_secs(3),
            "批间暂停耗时异常: {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn test_empty_task_list() {
        let processor = BatchProcessor::new(Arc::new(MockApi::new()));
        let results = processor.run(&[], &instant_policy(), None).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(processor.progress().total, 0);
    }
}
