//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量任务处理器
//! - 单飞控制（同一实例同时只允许一次运行）
//! - 分批并发处理（Semaphore + tokio::spawn）
//! - 批间节流暂停
//! - 进度统计与观察者通知
//!
//! ### `task_pipeline` - 单个任务流水线
//! - 拉取详情 → 生成作答 → 模拟作答时长 → 提交
//! - 失败本地捕获，产出失败结果
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<Task>)
//!     ↓
//! task_pipeline (处理单个 Task)
//!     ↓
//! services (能力层：answer_synthesizer / submission_builder)
//!     ↓
//! clients (平台接口：TaskApi)
//! ```

pub mod batch_processor;
pub mod task_pipeline;

pub use batch_processor::{BatchProcessor, ProgressCallback, DEFAULT_BATCH_SIZE};
pub use task_pipeline::{pacing_delay, process_task, MAX_PACING_SECS};
