//! # 命令行接口模块
//!
//! 使用 `clap` 定义了程序的命令行结构，包括子命令和参数。
//! 所有用户通过命令行与程序交互的入口点都在此模块中定义。

use clap::Parser;
use std::path::PathBuf;

/// 先用 LZW 压缩任意文件，再把它隐藏到 24 位 BMP / PNG 图像的蓝色通道最低位中。
#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = "先用 LZW 压缩任意文件，再把它隐藏到 24 位 BMP / PNG 图像的蓝色通道最低位中。\n\
                  设置环境变量 RUST_LOG=debug 可查看详细的处理过程。"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令：embed (嵌入)、extract (提取) 和 check (检查)。
#[derive(Parser, Debug)]
pub enum Commands {
    /// 把文件压缩后嵌入到 24 位 BMP 或 RGB PNG 图像中。
    Embed(EmbedArgs),

    /// 从经过隐写的图像中提取并解压文件。
    Extract(ExtractArgs),

    /// 检查图像格式并报告可用的嵌入容量。
    Check(CheckArgs),
}

/// 'embed' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct EmbedArgs {
    /// 用于隐写的输入图像文件路径 (24 位 BMP 或 RGB PNG)。
    #[arg(short, long)]
    pub image: PathBuf,

    /// 要隐藏的文件路径，其扩展名 (最多 3 字节) 会一并嵌入。
    #[arg(short, long)]
    pub payload: PathBuf,

    /// 结果图像的输出路径。扩展名为 png 时输出 PNG，否则输出 BMP。
    /// 默认在输入图像旁生成 `doctored_<文件名>`。
    #[arg(short, long)]
    pub dest: Option<PathBuf>,

    /// 目标文件已存在时强制覆盖。
    #[arg(short, long)]
    pub force: bool,
}

/// 'extract' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct ExtractArgs {
    /// 已嵌入文件的图像路径。
    #[arg(short, long)]
    pub image: PathBuf,

    /// 恢复文件的基础路径，最终文件名为 `<基础路径>.<标签>`。
    /// 默认在输入图像旁生成 `recovered_<文件名>`。
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 目标文件已存在时强制覆盖。
    #[arg(short, long)]
    pub force: bool,
}

/// 'check' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// 要检查的图像文件路径。
    #[arg(short, long)]
    pub image: PathBuf,
}
