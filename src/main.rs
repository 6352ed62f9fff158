use anyhow::{bail, Result};
use questionnaire_agent::utils::logging;
use questionnaire_agent::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置
    let mut config = Config::load()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        // 单题模式: questionnaire_agent ask "问题"
        Some("ask") => {
            let question = args[1..].join(" ");
            if question.trim().is_empty() {
                bail!("用法: questionnaire_agent ask \"<问题>\"");
            }
            let app = App::initialize(config)?;
            let answer = app.ask(&question).await?;
            println!("{}", answer.text);
        }
        // 批量模式: questionnaire_agent [工作簿路径]
        other => {
            if let Some(path) = other {
                config.workbook_path = path.into();
            }
            let app = App::initialize(config)?;
            app.run().await?;
        }
    }

    Ok(())
}
