//! 提交载荷构建 - 业务能力层
//!
//! ## 职责
//!
//! 把一个任务详情变成可提交的作答载荷：逐题调用作答合成，
//! 按题目 id 汇总成 answers 映射，并盖上时间戳和提交状态。
//!
//! 除读取注入的时钟和随机源外是纯函数，不做任何网络访问。

use crate::models::{AnswerEntry, SubmissionPayload, SubmissionPolicy, SubmissionStatus, TaskDetail};
use crate::services::answer_synthesizer::synthesize_answer;
use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use std::collections::HashMap;
use tracing::debug;

/// 构建任务提交载荷
///
/// # 参数
/// - `detail`: 任务详情（`questions` 在顶层或 `data` 下都可以）
/// - `policy`: 提交策略（含草稿开关）
/// - `rng`: 随机源
/// - `now`: 构建时刻，两个时间戳都取这一瞬间
pub fn build_payload(
    detail: &TaskDetail,
    policy: &SubmissionPolicy,
    rng: &mut impl Rng,
    now: DateTime<Utc>,
) -> SubmissionPayload {
    let mut answers = HashMap::new();

    for question in detail.questions() {
        let question_id = match question.resolved_id() {
            Some(id) => id,
            None => {
                debug!("跳过没有 id 的题目");
                continue;
            }
        };

        let entry = AnswerEntry {
            question_id: question_id.clone(),
            question_type: question.resolved_tag().to_string(),
            answer: synthesize_answer(&question, policy, rng),
        };

        // 同 id 的题目后出现的覆盖先出现的，不视为错误
        answers.insert(question_id, entry);
    }

    let timestamp = format_timestamp(now);

    SubmissionPayload {
        accessed_on: timestamp.clone(),
        executed_on: timestamp,
        answers,
        is_final: !policy.is_draft,
        status: if policy.is_draft {
            SubmissionStatus::Draft
        } else {
            SubmissionStatus::Submitted
        },
    }
}

/// 平台要求的时间戳格式（毫秒精度、Z 结尾）
pub fn format_timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}
