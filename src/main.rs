use anyhow::Result;
use auto_task_submit::app::App;
use auto_task_submit::config::Config;
use auto_task_submit::utils::logging;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置
    let config = Config::load();

    // 初始化并运行应用
    App::initialize(config)?.run().await?;

    Ok(())
}
