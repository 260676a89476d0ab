use std::path::Path;

use anyhow::{Context, Result};
use clap::{Arg, Command};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use analyzer_core::{init_logging, AppConfig};
use req_analyzer::{load_requests, Application};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let matches = Command::new("req-analyzer")
        .version("1.0.0")
        .about("需求分析任务调度服务")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径（缺省时查找 config/analyzer.toml）"),
        )
        .arg(
            Arg::new("job")
                .short('j')
                .long("job")
                .value_name("FILE")
                .help("任务请求文件（JSON，单个请求或数组）")
                .required(true),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("结果输出文件，缺省输出到标准输出"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别")
                .value_parser(["trace", "debug", "info", "warn", "error"]),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式")
                .value_parser(["json", "pretty"]),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config");
    let job_path = matches
        .get_one::<String>("job")
        .context("缺少任务文件参数")?;
    let output_path = matches.get_one::<String>("output");
    // 命令行参数优先于配置文件中的日志设置
    let config = AppConfig::load(config_path.map(String::as_str)).context("加载配置失败")?;
    let log_level = matches
        .get_one::<String>("log-level")
        .unwrap_or(&config.observability.log_level);
    let log_format = matches
        .get_one::<String>("log-format")
        .unwrap_or(&config.observability.log_format);

    init_logging(log_level, log_format)?;

    info!("启动需求分析任务调度服务");
    if let Some(path) = config_path {
        info!("配置文件: {path}");
    }

    let requests = load_requests(Path::new(job_path))?;
    info!("任务文件 {} 包含 {} 个请求", job_path, requests.len());

    let app = Application::new(&config)?;

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        signal_token.cancel();
    });

    let results = app.run(requests, shutdown).await?;
    let rendered = serde_json::to_string_pretty(&results).context("序列化结果失败")?;

    match output_path {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("写入结果文件失败: {path}"))?;
            info!("结果已写入 {path}");
        }
        None => println!("{rendered}"),
    }

    info!("需求分析任务调度服务已退出");
    Ok(())
}

/// 等待关闭信号
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("安装Ctrl+C信号处理器失败: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("安装SIGTERM信号处理器失败: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("收到Ctrl+C信号");
        },
        _ = terminate => {
            info!("收到SIGTERM信号");
        },
    }
}
