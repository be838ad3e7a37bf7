//! 学习平台 API 客户端
//!
//! 负责所有与平台 HTTP 接口的交互：登录、房间列表、任务列表、任务详情、提交作答。
//! 接口返回的各种形状差异（裸数组 / `{tasks: []}`、`data` 包装层、字符串或数字 id）
//! 都在这一层规整掉，核心管线拿到的永远是统一的模型。

use crate::clients::TaskApi;
use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult};
use crate::models::{Room, SubmissionPayload, Task, TaskDetail};
use crate::services::account_store::format_ra;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// 登录成功后的会话信息
#[derive(Debug, Clone)]
pub struct LoginInfo {
    pub auth_token: String,
    pub nick: Option<String>,
}

/// 学习平台 API 客户端
///
/// 登录后持有会话令牌；一次批量运行期间令牌只读共享，不做中途轮换
pub struct EduspClient {
    http: reqwest::Client,
    base_url: String,
    client_origin: String,
    user_agent: String,
    auth_token: Option<String>,
}

impl EduspClient {
    /// 创建新的平台客户端
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.api_base_url.clone(),
            client_origin: config.client_origin.clone(),
            user_agent: config.user_agent.clone(),
            auth_token: None,
        }
    }

    /// 登录
    ///
    /// RA 先做规整（去空格、转小写、纯数字补 sp 后缀）再发给平台；
    /// 成功后令牌保存在客户端内，后续请求自动携带
    pub async fn login(&mut self, ra: &str, password: &str) -> AppResult<LoginInfo> {
        let ra = format_ra(ra);
        let endpoint = format!("{}/registration/edusp", self.base_url);

        info!("🔑 正在登录平台 (RA: {})...", ra);

        let body = json!({
            "realm": "edusp",
            "platform": "webclient",
            "id": ra,
            "password": password,
        });

        let response = self
            .request(reqwest::Method::POST, &endpoint)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Api(ApiError::BadResponse {
                endpoint,
                status: Some(response.status().as_u16()),
                message: Some("登录请求被拒绝".to_string()),
            }));
        }

        let data: Value = response.json().await?;

        let auth_token = data
            .get("auth_token")
            .and_then(|t| t.as_str())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
            .ok_or_else(|| AppError::auth_failed("响应中没有 auth_token，请检查账号密码"))?;

        let nick = data
            .get("nick")
            .and_then(|n| n.as_str())
            .map(|n| n.to_string());

        self.auth_token = Some(auth_token.clone());

        info!("✓ 登录成功{}", nick.as_deref().map(|n| format!("，欢迎 {}", n)).unwrap_or_default());

        Ok(LoginInfo { auth_token, nick })
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_token.is_some()
    }

    /// 拉取用户加入的所有房间
    pub async fn fetch_rooms(&self) -> AppResult<Vec<Room>> {
        let endpoint = format!("{}/room/user", self.base_url);

        let response = self
            .request(reqwest::Method::GET, &endpoint)
            .query(&[("list_all", "true"), ("with_cards", "true")])
            .send()
            .await?;

        let body: Value = response.json().await?;

        let rooms = body
            .get("rooms")
            .and_then(|r| r.as_array())
            .map(|list| list.iter().filter_map(Room::from_value).collect())
            .unwrap_or_default();

        Ok(rooms)
    }

    /// 拉取所有房间的待办任务并去重
    ///
    /// # 参数
    /// - `filter`: 任务筛选方式，`expired` 表示只取过期任务，其余取未完成任务
    ///
    /// 单个房间的拉取失败只记日志并跳过，不影响其他房间
    pub async fn fetch_todo_tasks(&self, filter: &str) -> AppResult<Vec<Task>> {
        let expired_only = filter == "expired";
        let rooms = self.fetch_rooms().await?;

        info!("📚 找到 {} 个房间，逐个拉取任务...", rooms.len());

        let mut all_tasks = Vec::new();

        for room in &rooms {
            match self.fetch_room_tasks(&room.id, expired_only).await {
                Ok(mut tasks) => {
                    debug!("房间 {} 返回 {} 个任务", room.id, tasks.len());
                    all_tasks.append(&mut tasks);
                }
                Err(e) => {
                    warn!("⚠️ 房间 {} 任务拉取失败，跳过: {}", room.id, e);
                }
            }
        }

        Ok(dedup_tasks(all_tasks))
    }

    /// 拉取单个房间的待办任务
    async fn fetch_room_tasks(&self, room_id: &str, expired_only: bool) -> AppResult<Vec<Task>> {
        let endpoint = format!("{}/tms/task/todo", self.base_url);

        let response = self
            .request(reqwest::Method::GET, &endpoint)
            .query(&[
                ("publication_target", room_id),
                ("limit", "100"),
                ("offset", "0"),
                ("expired_only", if expired_only { "true" } else { "false" }),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Api(ApiError::BadResponse {
                endpoint,
                status: Some(response.status().as_u16()),
                message: None,
            }));
        }

        let body: Value = response.json().await?;
        Ok(parse_task_list(&body))
    }

    /// 构建带统一头部的请求
    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .request(method, url)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .header("User-Agent", &self.user_agent)
            .header("Origin", &self.client_origin);

        if let Some(token) = &self.auth_token {
            builder = builder.header("x-api-key", token);
        }

        builder
    }
}

#[async_trait]
impl TaskApi for EduspClient {
    async fn fetch_task_detail(&self, task_id: &str) -> AppResult<TaskDetail> {
        let endpoint = format!("{}/tms/task/{}", self.base_url, task_id);

        let response = self.request(reqwest::Method::GET, &endpoint).send().await?;

        if !response.status().is_success() {
            return Err(AppError::Api(ApiError::BadResponse {
                endpoint,
                status: Some(response.status().as_u16()),
                message: None,
            }));
        }

        let body: Value = response.json().await?;
        Ok(TaskDetail::from_response(body))
    }

    async fn submit_task(&self, task_id: &str, payload: &SubmissionPayload) -> AppResult<Value> {
        let endpoint = format!("{}/tms/task/{}/answer", self.base_url, task_id);

        let response = self
            .request(reqwest::Method::POST, &endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|e| AppError::submit_failed(task_id, e))?;

        if !response.status().is_success() {
            return Err(AppError::Api(ApiError::BadResponse {
                endpoint,
                status: Some(response.status().as_u16()),
                message: Some("提交被平台拒绝".to_string()),
            }));
        }

        let result: Value = response.json().await?;
        Ok(result)
    }
}

// ========== 响应规整辅助函数 ==========

/// 从任务列表响应中提取任务
///
/// 平台有时返回裸数组，有时返回 `{tasks: []}`，两种都接受；
/// 没有可用 id 的条目直接丢弃
pub fn parse_task_list(body: &Value) -> Vec<Task> {
    let items = if let Some(array) = body.as_array() {
        array
    } else if let Some(array) = body.get("tasks").and_then(|t| t.as_array()) {
        array
    } else {
        return Vec::new();
    };

    items.iter().filter_map(Task::from_value).collect()
}

/// 按任务 id 去重，保留先出现的
pub fn dedup_tasks(tasks: Vec<Task>) -> Vec<Task> {
    let mut seen = HashSet::new();
    tasks
        .into_iter()
        .filter(|task| seen.insert(task.id.clone()))
        .collect()
}
