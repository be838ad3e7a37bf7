use crate::error::{AppError, AppResult, ConfigError};
use serde::Deserialize;

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 学习平台 API 基础地址
    pub api_base_url: String,
    /// 请求携带的 Origin 头
    pub client_origin: String,
    /// 请求携带的 User-Agent 头
    pub user_agent: String,
    /// 学号（RA）
    pub student_id: String,
    /// 密码
    pub password: String,
    /// 任务筛选方式：pending / expired
    pub task_filter: String,
    /// 每批同时处理的任务数量
    pub batch_size: usize,
    /// 批次之间的暂停秒数
    pub inter_batch_pause_secs: u64,
    /// 模拟作答时长下限（分钟）
    pub min_delay_minutes: u64,
    /// 模拟作答时长上限（分钟）
    pub max_delay_minutes: u64,
    /// 无 correct 标记时选择第一个选项的概率（0-100）
    pub correctness_target_percent: u32,
    /// 是否以草稿方式保存（不最终提交）
    pub save_as_draft: bool,
    /// 是否直接采用选项里的 correct 标记（默认关闭）
    pub use_known_correct_answer: bool,
    /// 已保存账号的存放文件
    pub accounts_file: String,
    /// 登录成功后是否保存账号
    pub remember_account: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "https://edusp-api.ip.tv".to_string(),
            client_origin: "https://taskitos.cupiditys.lol".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36"
                .to_string(),
            student_id: String::new(),
            password: String::new(),
            task_filter: "pending".to_string(),
            batch_size: 3,
            inter_batch_pause_secs: 1,
            min_delay_minutes: 1,
            max_delay_minutes: 3,
            correctness_target_percent: 75,
            save_as_draft: false,
            use_known_correct_answer: false,
            accounts_file: "accounts.json".to_string(),
            remember_account: false,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            api_base_url: std::env::var("API_BASE_URL").unwrap_or(default.api_base_url),
            client_origin: std::env::var("CLIENT_ORIGIN").unwrap_or(default.client_origin),
            user_agent: std::env::var("CLIENT_USER_AGENT").unwrap_or(default.user_agent),
            student_id: std::env::var("STUDENT_RA").unwrap_or(default.student_id),
            password: std::env::var("STUDENT_PASSWORD").unwrap_or(default.password),
            task_filter: std::env::var("TASK_FILTER").unwrap_or(default.task_filter),
            batch_size: std::env::var("BATCH_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.batch_size),
            inter_batch_pause_secs: std::env::var("INTER_BATCH_PAUSE_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.inter_batch_pause_secs),
            min_delay_minutes: std::env::var("MIN_DELAY_MINUTES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.min_delay_minutes),
            max_delay_minutes: std::env::var("MAX_DELAY_MINUTES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_delay_minutes),
            correctness_target_percent: std::env::var("CORRECTNESS_TARGET_PERCENT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.correctness_target_percent),
            save_as_draft: std::env::var("SAVE_AS_DRAFT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.save_as_draft),
            use_known_correct_answer: std::env::var("USE_KNOWN_CORRECT_ANSWER").ok().and_then(|v| v.parse().ok()).unwrap_or(default.use_known_correct_answer),
            accounts_file: std::env::var("ACCOUNTS_FILE").unwrap_or(default.accounts_file),
            remember_account: std::env::var("REMEMBER_ACCOUNT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.remember_account),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
        }
    }

    /// 从 TOML 配置文件加载
    pub fn from_toml_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::File(crate::error::FileError::ReadFailed {
                path: path.to_string(),
                source: Box::new(e),
            })
        })?;

        toml::from_str(&content).map_err(|e| {
            AppError::Config(ConfigError::TomlParseFailed {
                path: path.to_string(),
                source: Box::new(e),
            })
        })
    }

    /// 优先读取配置文件，不存在时退回环境变量
    pub fn load() -> Self {
        const CONFIG_FILE: &str = "config.toml";

        if std::path::Path::new(CONFIG_FILE).exists() {
            match Self::from_toml_file(CONFIG_FILE) {
                Ok(config) => return config,
                Err(e) => {
                    eprintln!("配置文件读取失败，改用环境变量: {}", e);
                }
            }
        }

        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.inter_batch_pause_secs, 1);
        assert_eq!(config.correctness_target_percent, 75);
        assert!(!config.use_known_correct_answer, "correct 标记默认不启用");
        assert!(!config.save_as_draft);
    }

    #[test]
    fn test_from_toml_str() {
        let toml_str = r#"
            student_id = "12345678sp"
            batch_size = 5
            save_as_draft = true
        "#;
        let config: Config = toml::from_str(toml_str).expect("解析配置失败");
        assert_eq!(config.student_id, "12345678sp");
        assert_eq!(config.batch_size, 5);
        assert!(config.save_as_draft);
        // 未给出的字段应落到默认值
        assert_eq!(config.api_base_url, "https://edusp-api.ip.tv");
        assert_eq!(config.max_delay_minutes, 3);
    }
}
