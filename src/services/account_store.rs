//! 账号存储 - 业务能力层
//!
//! 只负责"保存/列出/删除已登录账号"能力，不关心登录流程。
//! 核心处理管线不直接接触存储，由应用层把本服务接进来。

use crate::error::{AppError, AppResult, FileError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// 已保存的账号
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedAccount {
    pub student_id: String,
    pub password: String,
    pub added_at: String,
    pub last_used: String,
}

/// 账号存储服务
///
/// 账号以 JSON 数组形式保存在单个文件里，最近使用的排在最前
pub struct AccountStore {
    file_path: String,
}

impl AccountStore {
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    /// 列出所有已保存账号
    ///
    /// 文件不存在时返回空列表
    pub fn list(&self) -> AppResult<Vec<SavedAccount>> {
        if !Path::new(&self.file_path).exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.file_path).map_err(|e| {
            AppError::File(FileError::ReadFailed {
                path: self.file_path.clone(),
                source: Box::new(e),
            })
        })?;

        serde_json::from_str(&content).map_err(|e| {
            AppError::File(FileError::JsonParseFailed {
                path: self.file_path.clone(),
                source: Box::new(e),
            })
        })
    }

    /// 保存账号
    ///
    /// 学号先做规整（去空格、转小写）；已存在的同名账号会被替换并移到最前
    pub fn save(&self, student_id: &str, password: &str) -> AppResult<()> {
        let student_id = student_id.trim().to_lowercase();
        if student_id.is_empty() || password.is_empty() {
            return Ok(());
        }

        let now = chrono::Utc::now().to_rfc3339();
        let mut accounts = self.list()?;
        accounts.retain(|acc| acc.student_id != student_id);
        accounts.insert(
            0,
            SavedAccount {
                student_id: student_id.clone(),
                password: password.to_string(),
                added_at: now.clone(),
                last_used: now,
            },
        );

        debug!("保存账号: {}", student_id);
        self.persist(&accounts)
    }

    /// 删除账号，返回是否确有删除
    pub fn remove(&self, student_id: &str) -> AppResult<bool> {
        let student_id = student_id.trim().to_lowercase();
        let mut accounts = self.list()?;
        let before = accounts.len();
        accounts.retain(|acc| acc.student_id != student_id);

        if accounts.len() == before {
            return Ok(false);
        }

        self.persist(&accounts)?;
        Ok(true)
    }

    /// 更新账号的最近使用时间
    pub fn touch(&self, student_id: &str) -> AppResult<()> {
        let student_id = student_id.trim().to_lowercase();
        let mut accounts = self.list()?;

        if let Some(acc) = accounts.iter_mut().find(|a| a.student_id == student_id) {
            acc.last_used = chrono::Utc::now().to_rfc3339();
            self.persist(&accounts)?;
        }

        Ok(())
    }

    fn persist(&self, accounts: &[SavedAccount]) -> AppResult<()> {
        let content = serde_json::to_string_pretty(accounts)?;
        fs::write(&self.file_path, content)
            .map_err(|e| AppError::file_write_failed(self.file_path.clone(), e))
    }
}

// ========== RA 规整辅助函数 ==========

/// 校验 RA（学号）格式
pub fn is_valid_ra(ra: &str) -> bool {
    let ra = ra.trim().to_lowercase();
    if ra.is_empty() {
        return false;
    }

    if let Ok(re) = Regex::new(r"^\d+[a-z]?sp$") {
        if re.is_match(&ra) {
            return true;
        }
    }

    ra.chars().all(|c| c.is_ascii_digit())
}

/// 规整 RA：去空格、转小写，纯数字时补上 sp 后缀
pub fn format_ra(ra: &str) -> String {
    let ra = ra.trim().to_lowercase();
    if ra.is_empty() || ra.ends_with("sp") {
        return ra;
    }

    if ra.chars().all(|c| c.is_ascii_digit()) {
        return format!("{}sp", ra);
    }

    ra
}
