//! 作答合成 - 业务能力层
//!
//! ## 职责
//!
//! 根据题目类型生成可提交的作答值，只处理单个 Question。
//!
//! ## 设计特点
//!
//! - **纯函数**：无状态、无 I/O，随机源由调用方注入，测试可用固定种子
//! - **尽力而为**：结构不符合题型预期时返回该题型的空默认值，从不报错，
//!   远端评分对空作答的容忍度未知，这里选择静默降级而不是中断整卷

use crate::models::{Question, QuestionType, SubmissionPolicy};
use crate::utils::text::{clip_chars, strip_html_tags};
use rand::Rng;
use serde_json::{json, Value};

/// 文本题作答的最大字符数
const TEXT_ANSWER_MAX_CHARS: usize = 500;

/// 合成单个题目的作答值
///
/// # 参数
/// - `question`: 题目
/// - `policy`: 本次运行的提交策略
/// - `rng`: 随机源（注入以便测试复现）
///
/// # 返回
/// 作答值，结构随题型变化；不认识的题型返回空对象
pub fn synthesize_answer(
    question: &Question,
    policy: &SubmissionPolicy,
    rng: &mut impl Rng,
) -> Value {
    match question.resolved_type() {
        QuestionType::SingleChoice | QuestionType::MultipleChoice => {
            synthesize_choice(&question.options, policy, rng)
        }
        QuestionType::OrderSentences => synthesize_order_sentences(&question.options),
        QuestionType::FillWords => synthesize_fill_words(&question.options),
        QuestionType::TextAi | QuestionType::Text | QuestionType::Essay => {
            synthesize_text(question)
        }
        QuestionType::FillLetters => question
            .options
            .get("answer")
            .cloned()
            .unwrap_or_else(|| json!({})),
        QuestionType::Cloud => question
            .options
            .get("ids")
            .cloned()
            .unwrap_or_else(|| json!([])),
        QuestionType::Unknown => json!({}),
    }
}

/// 选择题：可选的 correct 标记直采 + 概率性选first的启发式
///
/// correct 标记只在策略显式开启时才使用，默认不读
fn synthesize_choice(options: &Value, policy: &SubmissionPolicy, rng: &mut impl Rng) -> Value {
    let list = match options.as_array() {
        Some(list) => list,
        None => return Value::Null,
    };

    if policy.use_known_correct_answer {
        let flagged = list
            .iter()
            .find(|opt| opt.get("correct").and_then(|c| c.as_bool()).unwrap_or(false));
        if let Some(opt) = flagged {
            if let Some(id) = option_id(opt) {
                return id;
            }
        }
    }

    // 无标记（或未启用标记）时走启发式：以目标正确率的概率选第一个选项，
    // 否则等概率随机选一个
    let roll: f64 = rng.gen_range(0.0..100.0);
    if roll <= policy.correctness_target_percent as f64 {
        if let Some(first) = list.first() {
            if let Some(id) = option_id(first) {
                return id;
            }
        }
    }

    if list.is_empty() {
        return Value::Null;
    }

    let index = rng.gen_range(0..list.len());
    option_id(&list[index]).unwrap_or(Value::Null)
}

/// 排序题：按给出的顺序原样返回句子
///
/// 不做真正的排序计算，只回显呈现顺序
fn synthesize_order_sentences(options: &Value) -> Value {
    match options.get("sentences").and_then(|s| s.as_array()) {
        Some(sentences) => Value::Array(sentences.iter().map(display_value).collect()),
        None => json!([]),
    }
}

/// 填词题：取 phrase 序列中所有奇数下标（0 起）的元素
fn synthesize_fill_words(options: &Value) -> Value {
    match options.get("phrase").and_then(|p| p.as_array()) {
        Some(phrase) => Value::Array(
            phrase
                .iter()
                .enumerate()
                .filter(|(i, _)| i % 2 == 1)
                .map(|(_, item)| display_value(item))
                .collect(),
        ),
        None => json!([]),
    }
}

/// 文本题：去掉 HTML 标签、截断后包成 {"0": 文本}
fn synthesize_text(question: &Question) -> Value {
    let clean = clip_chars(
        &strip_html_tags(question.source_text()),
        TEXT_ANSWER_MAX_CHARS,
    );
    json!({ "0": clean })
}

// ========== 辅助函数 ==========

/// 选项 id：`id` 优先，缺失时退回 `optionId`
fn option_id(opt: &Value) -> Option<Value> {
    opt.get("id")
        .filter(|v| !v.is_null())
        .or_else(|| opt.get("optionId").filter(|v| !v.is_null()))
        .cloned()
}

/// 句子/词条的显示值：`value` → `text` → 元素本身
fn display_value(item: &Value) -> Value {
    let non_empty = |v: &&Value| !v.is_null() && v.as_str().map_or(true, |s| !s.is_empty());

    item.get("value")
        .filter(non_empty)
        .or_else(|| item.get("text").filter(non_empty))
        .cloned()
        .unwrap_or_else(|| item.clone())
}
