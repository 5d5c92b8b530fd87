use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

use rust_blog::cli;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志系统，RUST_LOG 未设置时默认 info
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    // 解析命令行参数
    let cli = cli::Cli::parse();

    println!("{} {}", "rust-blog".bright_cyan(), env!("CARGO_PKG_VERSION").bright_green());
    println!("{}", "A small blog server with categories, tags, archives and comments".bright_white());
    println!();

    if let Err(e) = cli::execute(cli).await {
        error!("Error: {}", e);

        // 打印错误链
        for cause in e.chain().skip(1) {
            error!("Caused by: {}", cause);
        }

        std::process::exit(1);
    }

    Ok(())
}
