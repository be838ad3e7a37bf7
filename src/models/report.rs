use serde::Serialize;
use serde_json::Value;

/// 单个任务失败的环节
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// 拉取任务详情失败
    Fetch,
    /// 提交作答失败
    Submit,
    /// 流水线内部错误（任务被中断等）
    Internal,
}

/// 单个任务的处理结果
///
/// 每个输入任务恰好产出一条，生成后不再修改
#[derive(Debug, Clone, Serialize)]
pub struct TaskResult {
    pub task_id: String,
    pub task_title: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submit_response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub timestamp: String,
}

impl TaskResult {
    pub fn succeeded(
        task_id: String,
        task_title: String,
        submit_response: Value,
        timestamp: String,
    ) -> Self {
        Self {
            task_id,
            task_title,
            success: true,
            submit_response: Some(submit_response),
            error_kind: None,
            error_message: None,
            timestamp,
        }
    }

    pub fn failed(
        task_id: String,
        task_title: String,
        kind: ErrorKind,
        message: String,
        timestamp: String,
    ) -> Self {
        Self {
            task_id,
            task_title,
            success: false,
            submit_response: None,
            error_kind: Some(kind),
            error_message: Some(message),
            timestamp,
        }
    }
}

/// 批量处理进度
///
/// 只在一次运行内由处理器更新，观察者拿到的是快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingProgress {
    pub total: usize,
    pub completed_count: usize,
    pub failed_count: usize,
}

impl ProcessingProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed_count: 0,
            failed_count: 0,
        }
    }

    /// 已结束（无论成败）的任务数
    pub fn settled(&self) -> usize {
        self.completed_count + self.failed_count
    }
}
