use clap::Parser;
use tracing_subscriber::EnvFilter;

use lzw_stego::{
    cli::{Cli, Commands},
    handler::{handle_check, handle_embed, handle_extract},
};

/// 程序的主入口点
///
/// 负责初始化日志、解析命令行参数，并根据指定的子命令
/// 将执行分派到相应的处理函数。任何错误都会使进程以非零状态码退出。
fn main() -> anyhow::Result<()> {
    // 日志输出到 stderr，默认只显示警告，可通过 RUST_LOG 调整
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    // 解析命令行参数
    let cli = Cli::parse();

    // 根据子命令调用相应的处理函数
    match cli.command {
        Commands::Embed(args) => handle_embed(args),
        Commands::Extract(args) => handle_extract(args),
        Commands::Check(args) => handle_check(args),
    }
}
