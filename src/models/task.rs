use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 把 JSON 里的 id 字段规整为字符串
///
/// 平台接口有时返回字符串 id，有时返回数字 id，这里统一成 String
pub(crate) fn value_to_id_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn deserialize_loose_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    Ok(value_to_id_string(&v))
}

fn deserialize_loose_tag<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    Ok(v.as_str().map(|s| s.to_string()))
}

/// 任务列表项
///
/// 从房间任务列表接口得到，详情在处理阶段按需拉取
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: String,
    pub title: Option<String>,
    pub subject: Option<String>,
    /// 已经拿到的任务详情；有值时流水线不再重复拉取
    #[serde(skip_serializing)]
    pub raw_detail: Option<TaskDetail>,
}

impl Task {
    /// 从接口返回的 JSON 对象构造任务
    ///
    /// id 字段可能叫 `id` 或 `task_id`，都不存在时视为无效条目
    pub fn from_value(v: &Value) -> Option<Self> {
        let id = v
            .get("id")
            .and_then(value_to_id_string)
            .or_else(|| v.get("task_id").and_then(value_to_id_string))?;

        Some(Self {
            id,
            title: v.get("title").and_then(|t| t.as_str()).map(|s| s.to_string()),
            subject: v
                .get("subject")
                .and_then(|s| s.as_str())
                .map(|s| s.to_string()),
            raw_detail: None,
        })
    }

    /// 用于日志展示的任务标题
    pub fn display_title(&self) -> String {
        match &self.title {
            Some(title) if !title.is_empty() => title.clone(),
            _ => format!("任务 {}", self.id),
        }
    }
}

/// 用户加入的房间（教室）
#[derive(Debug, Clone, Serialize)]
pub struct Room {
    pub id: String,
    pub name: Option<String>,
}

impl Room {
    pub fn from_value(v: &Value) -> Option<Self> {
        let id = v.get("id").and_then(value_to_id_string)?;
        Some(Self {
            id,
            name: v.get("name").and_then(|n| n.as_str()).map(|s| s.to_string()),
        })
    }
}

/// 题目类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionType {
    SingleChoice,
    MultipleChoice,
    OrderSentences,
    FillWords,
    TextAi,
    Text,
    Essay,
    FillLetters,
    Cloud,
    /// 未识别的类型，作答时返回空对象
    Unknown,
}

impl QuestionType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "single_choice" => QuestionType::SingleChoice,
            "multiple_choice" => QuestionType::MultipleChoice,
            "order-sentences" => QuestionType::OrderSentences,
            "fill-words" => QuestionType::FillWords,
            "text_ai" => QuestionType::TextAi,
            "text" => QuestionType::Text,
            "essay" => QuestionType::Essay,
            "fill-letters" => QuestionType::FillLetters,
            "cloud" => QuestionType::Cloud,
            _ => QuestionType::Unknown,
        }
    }
}

/// 任务中的一道题目
///
/// 字段全部宽松反序列化：平台不同题型返回的结构差异很大，
/// 缺失或类型不符的字段一律落为默认值，由作答环节兜底
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Question {
    #[serde(default, deserialize_with = "deserialize_loose_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_id")]
    pub question_id: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "deserialize_loose_tag")]
    pub type_tag: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_tag")]
    pub question_type: Option<String>,
    /// 选项集合，结构随题型变化，保持原始 JSON
    #[serde(default)]
    pub options: Value,
    #[serde(default)]
    pub comment: Value,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub text: Value,
}

impl Question {
    /// 题目 id：`id` 优先，缺失时退回 `question_id`
    pub fn resolved_id(&self) -> Option<String> {
        self.id.clone().or_else(|| self.question_id.clone())
    }

    /// 题目类型标签：`type` 优先，缺失时退回 `question_type`
    pub fn resolved_tag(&self) -> &str {
        self.type_tag
            .as_deref()
            .or(self.question_type.as_deref())
            .unwrap_or("")
    }

    pub fn resolved_type(&self) -> QuestionType {
        QuestionType::from_tag(self.resolved_tag())
    }

    /// 文本题的原始内容：comment → value → text，取第一个非空字符串
    pub fn source_text(&self) -> &str {
        [&self.comment, &self.value, &self.text]
            .into_iter()
            .find_map(|v| v.as_str().filter(|s| !s.is_empty()))
            .unwrap_or("")
    }
}

/// 任务详情
///
/// 详情接口的返回可能包了一层 `data`，构造时统一剥掉；
/// 题目列表可能在 `questions` 或 `data.questions` 下，两种都接受
#[derive(Debug, Clone)]
pub struct TaskDetail {
    raw: Value,
}

impl TaskDetail {
    /// 从详情接口的响应体构造（剥掉 `data` 包装层）
    pub fn from_response(body: Value) -> Self {
        let raw = match body.get("data") {
            Some(data) if data.is_object() => data.clone(),
            _ => body,
        };
        Self { raw }
    }

    /// 直接从已规整的 JSON 构造
    pub fn from_value(raw: Value) -> Self {
        Self { raw }
    }

    /// 提取题目列表
    pub fn questions(&self) -> Vec<Question> {
        let list = self
            .raw
            .get("questions")
            .and_then(|q| q.as_array())
            .or_else(|| {
                self.raw
                    .get("data")
                    .and_then(|d| d.get("questions"))
                    .and_then(|q| q.as_array())
            });

        match list {
            Some(items) => items
                .iter()
                .filter(|v| v.is_object())
                .filter_map(|v| serde_json::from_value(v.clone()).ok())
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}
