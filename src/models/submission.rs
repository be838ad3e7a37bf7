use crate::config::Config;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// 一次批量运行的提交策略
///
/// 由调用方提供，运行期间不可变
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionPolicy {
    /// 模拟作答时长下限（分钟）
    pub min_delay_minutes: u64,
    /// 模拟作答时长上限（分钟）
    pub max_delay_minutes: u64,
    /// 是否以草稿方式保存
    pub is_draft: bool,
    /// 无 correct 标记时选择第一个选项的概率（0-100）
    pub correctness_target_percent: u32,
    /// 是否直接采用选项里的 correct 标记
    pub use_known_correct_answer: bool,
}

impl Default for SubmissionPolicy {
    fn default() -> Self {
        Self {
            min_delay_minutes: 1,
            max_delay_minutes: 3,
            is_draft: false,
            correctness_target_percent: 75,
            use_known_correct_answer: false,
        }
    }
}

impl From<&Config> for SubmissionPolicy {
    fn from(config: &Config) -> Self {
        Self {
            min_delay_minutes: config.min_delay_minutes,
            max_delay_minutes: config.max_delay_minutes,
            is_draft: config.save_as_draft,
            correctness_target_percent: config.correctness_target_percent,
            use_known_correct_answer: config.use_known_correct_answer,
        }
    }
}

/// 提交状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Draft,
    Submitted,
}

/// 单题作答条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerEntry {
    pub question_id: String,
    pub question_type: String,
    pub answer: Value,
}

/// 任务提交载荷
///
/// 每次提交前新建，不跨任务复用
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionPayload {
    pub accessed_on: String,
    pub executed_on: String,
    pub answers: HashMap<String, AnswerEntry>,
    #[serde(rename = "final")]
    pub is_final: bool,
    pub status: SubmissionStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_serializes_final_and_status() {
        let payload = SubmissionPayload {
            accessed_on: "2026-01-01T00:00:00.000Z".to_string(),
            executed_on: "2026-01-01T00:00:00.000Z".to_string(),
            answers: HashMap::new(),
            is_final: true,
            status: SubmissionStatus::Submitted,
        };

        let v = serde_json::to_value(&payload).unwrap();
        assert_eq!(v["final"], json!(true));
        assert_eq!(v["status"], json!("submitted"));
    }

    #[test]
    fn test_draft_status_tag() {
        let v = serde_json::to_value(SubmissionStatus::Draft).unwrap();
        assert_eq!(v, json!("draft"));
    }
}
