//! 应用主流程
//!
//! 把配置、平台客户端、账号存储和批量处理器组装起来：
//! 登录 → 拉取任务 → 批量处理 → 输出统计

use crate::clients::EduspClient;
use crate::config::Config;
use crate::models::{ProcessingProgress, SubmissionPolicy, Task, TaskResult};
use crate::orchestrator::{BatchProcessor, ProgressCallback};
use crate::services::AccountStore;
use crate::utils::logging::{init_log_file, truncate_text};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    client: EduspClient,
    store: AccountStore,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> Result<Self> {
        // 初始化日志文件
        init_log_file(&config.output_log_file)?;

        log_startup(&config);

        let client = EduspClient::new(&config);
        let store = AccountStore::new(config.accounts_file.clone());

        Ok(Self {
            config,
            client,
            store,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(self) -> Result<()> {
        let App {
            config,
            mut client,
            store,
        } = self;

        if config.student_id.is_empty() || config.password.is_empty() {
            anyhow::bail!("缺少账号密码，请设置 STUDENT_RA / STUDENT_PASSWORD 或写入 config.toml");
        }

        // 登录平台
        client.login(&config.student_id, &config.password).await?;

        // 按需保存账号（核心管线不接触存储，只在这里落盘）
        if config.remember_account {
            if let Err(e) = store.save(&config.student_id, &config.password) {
                warn!("⚠️ 账号保存失败: {}", e);
            }
        }

        // 拉取待处理任务
        info!("\n📁 正在拉取待处理的任务 (筛选: {})...", config.task_filter);
        let tasks = client.fetch_todo_tasks(&config.task_filter).await?;

        if tasks.is_empty() {
            warn!("⚠️ 没有找到待处理的任务，程序结束");
            return Ok(());
        }

        log_tasks_loaded(&tasks, config.batch_size, config.verbose_logging);

        // 批量处理
        let policy = SubmissionPolicy::from(&config);
        let processor = BatchProcessor::new(Arc::new(client))
            .with_batch_size(config.batch_size)
            .with_inter_batch_pause(Duration::from_secs(config.inter_batch_pause_secs));

        let callback: ProgressCallback = Arc::new(|p: ProcessingProgress| {
            info!(
                "📊 进度: {}/{} (成功 {}, 失败 {})",
                p.settled(),
                p.total,
                p.completed_count,
                p.failed_count
            );
        });

        let results = processor.run(&tasks, &policy, Some(callback)).await?;

        // 输出最终统计
        print_final_stats(&results, &config);

        Ok(())
    }
}

// ========== 日志辅助函数 ==========

fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量任务处理模式");
    info!("📊 每批任务数: {}", config.batch_size);
    if config.save_as_draft {
        info!("📝 本次运行以草稿方式保存，不做最终提交");
    }
    info!("{}", "=".repeat(60));
}

fn log_tasks_loaded(tasks: &[Task], batch_size: usize, verbose: bool) {
    info!("✓ 找到 {} 个待处理的任务", tasks.len());
    info!("📋 将以每批 {} 个的方式处理", batch_size);

    if verbose {
        for (i, task) in tasks.iter().enumerate() {
            info!(
                "  {}. {} {}",
                i + 1,
                truncate_text(&task.display_title(), 40),
                task.subject.as_deref().unwrap_or("")
            );
        }
    }
}

fn print_final_stats(results: &[TaskResult], config: &Config) {
    let success = results.iter().filter(|r| r.success).count();
    let failed = results.len() - success;

    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, results.len());
    info!("❌ 失败: {}", failed);

    if failed > 0 {
        for result in results.iter().filter(|r| !r.success) {
            info!(
                "  - {} ({}): {}",
                result.task_title,
                result.task_id,
                result.error_message.as_deref().unwrap_or("未知原因")
            );
        }
    }

    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", config.output_log_file);
}
