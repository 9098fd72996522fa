//! stratseed 命令行入口
//!
//! 运行命令：
//! stratseed seed --rules data/stratagems.json --store sqlite:stratagems.db
//! stratseed probe --base-url https://api.openai.com/v1

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use stratseed::config::DEFAULT_STORE;
use stratseed::{ConfigManager, LatencyProbe, Seeder, StoreLocation};

#[derive(Debug, Parser)]
#[command(name = "stratseed", version, about = "战术规则入库与 API 延迟探测工具")]
struct Cli {
    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 加载规则集并按名称写入存储
    Seed {
        /// 规则集 JSON 文件（缺省使用内置规则集）
        #[arg(long)]
        rules: Option<PathBuf>,
        /// 存储位置：memory / sqlite:<path> / mp:<path>
        #[arg(long, default_value = DEFAULT_STORE)]
        store: StoreLocation,
    },
    /// 向 chat/completions 服务发送三种请求并打印耗时
    Probe {
        #[arg(long, default_value = "https://api.openai.com/v1")]
        base_url: String,
        #[arg(long, default_value = "gpt-4o-mini")]
        model: String,
        /// 存放 API 凭据的环境变量名
        #[arg(long, default_value = "LLM_API_KEY")]
        api_key_env: String,
        /// 单次请求超时（秒）
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("运行失败：{:#}", e);
            ExitCode::FAILURE
        }
    }
}

// 日志写 stderr，stdout 只留报告
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Seed { rules, store } => {
            let config = ConfigManager::custom()
                .ruleset_path(rules)
                .store(store)
                .verbose(cli.verbose)
                .build();
            seed(config).await
        }
        Command::Probe {
            base_url,
            model,
            api_key_env,
            timeout,
        } => {
            let config = ConfigManager::custom()
                .probe_base_url(&base_url)?
                .probe_model(model)
                .probe_api_key_env(api_key_env)
                .probe_timeout(timeout)
                .verbose(cli.verbose)
                .build();
            probe(config).await
        }
    }
}

async fn seed(config: stratseed::GlobalConfig) -> anyhow::Result<()> {
    // 报告写 stdout；返回 Err 时以非零状态退出
    Seeder::seed(&config, &mut std::io::stdout())
        .await
        .with_context(|| format!("入库失败（存储 {}）", config.store))?;
    Ok(())
}

async fn probe(config: stratseed::GlobalConfig) -> anyhow::Result<()> {
    let probe = LatencyProbe::new(&config.probe)?;
    info!("探测地址：{}，模型：{}", probe.endpoint(), config.probe.model);

    for outcome in probe.run().await {
        println!("{}", outcome);
    }
    Ok(())
}
