//! # 命令处理逻辑模块
//!
//! 包含处理 `embed`、`extract` 和 `check` 子命令的高级业务逻辑。
//! 本模块负责协调文件 I/O、调用 LZW 编解码与隐写核心函数，以及向用户报告结果。

use crate::cli::{CheckArgs, EmbedArgs, ExtractArgs};
use crate::constants::{CODEWORD_BITS, EMBED_PREFIX, EXTRACT_PREFIX};
use crate::format::{self, ImageKind};
use crate::lzw;
use crate::raster::Raster;
use crate::steganography::{self, FileTag};
use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 在输入图像所在目录下生成 `<prefix><文件名主干><suffix>` 形式的路径。
fn sibling_path(image: &Path, prefix: &str, suffix: &str) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    image.with_file_name(format!("{prefix}{stem}{suffix}"))
}

/// 目标已存在且未指定 `--force` 时拒绝继续。
fn ensure_writable(path: &Path, force: bool) -> Result<()> {
    anyhow::ensure!(
        force || !path.exists(),
        "Output file already exists: {}. \nUse --force to overwrite it.",
        path.to_string_lossy().red().bold()
    );
    Ok(())
}

/// 处理 'Embed' 命令的执行逻辑。
///
/// 负责校验并读取图像、读取载荷文件、进行 LZW 压缩、
/// 把文件类型标签和码字写入像素，最后保存结果图像。
///
/// # Arguments
///
/// * `args` - 包含输入/输出路径的 `EmbedArgs` 结构体。
///
/// # Errors
///
/// 如果发生以下任一情况，将返回错误：
/// * 图像不是 24 位 BMP / RGB PNG，或无法读取。
/// * 目标文件已存在且未指定 `--force`。
/// * 无法读取载荷文件。
/// * 图像没有足够的空间容纳压缩后的载荷。
/// * 无法写入目标图像文件。
pub fn handle_embed(args: EmbedArgs) -> Result<()> {
    let kind = format::detect_file(&args.image).with_context(|| {
        format!(
            "Unsupported image file: {}",
            args.image.to_string_lossy().red().bold()
        )
    })?;

    let dest = args.dest.unwrap_or_else(|| {
        let suffix = match kind {
            ImageKind::Png24 => ".png",
            ImageKind::Bmp24 => ".bmp",
        };
        sibling_path(&args.image, EMBED_PREFIX, suffix)
    });
    ensure_writable(&dest, args.force)?;

    let mut raster = Raster::load(&args.image).with_context(|| {
        format!(
            "Unable to read image file: {}",
            args.image.to_string_lossy().red().bold()
        )
    })?;

    let payload = fs::read(&args.payload).with_context(|| {
        format!(
            "Unable to read payload file: {}",
            args.payload.to_string_lossy().red().bold()
        )
    })?;

    let tag = FileTag::from_path(&args.payload);
    if tag.is_empty() {
        warn!(payload = %args.payload.display(), "payload has no file extension, embedding an empty tag");
    }

    let codes = lzw::encode(&payload).context("Failed to compress the payload.")?;
    info!(
        kind = %kind,
        payload_bytes = payload.len(),
        codewords = codes.len(),
        tag = %tag,
        "payload compressed"
    );

    steganography::embed(&mut raster, &tag, &codes).with_context(|| {
        format!(
            "Failed to embed {} into {}.",
            args.payload.to_string_lossy().red().bold(),
            args.image.to_string_lossy().red().bold()
        )
    })?;

    raster.save(&dest).with_context(|| {
        format!(
            "Unable to write to target image file: {}",
            dest.to_string_lossy().red().bold()
        )
    })?;

    println!(
        "The file has been successfully hidden and saved: {}",
        dest.to_string_lossy().green().bold()
    );

    Ok(())
}

/// 处理 'Extract' 命令的执行逻辑。
///
/// 负责读取经过隐写的图像、恢复文件类型标签和码字、进行 LZW 解压，
/// 最后把恢复的文件写入 `<基础路径>.<标签>`。
///
/// # Arguments
///
/// * `args` - 包含输入/输出路径的 `ExtractArgs` 结构体。
///
/// # Errors
///
/// 如果发生以下任一情况，将返回错误：
/// * 无法读取或识别输入图像。
/// * 图像中的元数据损坏，或码字流无法解码。
/// * 目标文件已存在且未指定 `--force`。
/// * 无法写入恢复的文件。
pub fn handle_extract(args: ExtractArgs) -> Result<()> {
    let raster = Raster::load(&args.image).with_context(|| {
        format!(
            "Unable to read image file: {}",
            args.image.to_string_lossy().red().bold()
        )
    })?;

    let (tag, codes) = steganography::extract(&raster).with_context(|| {
        format!(
            "Failed to recover the hidden data from '{}'. \nThe image may not contain a hidden file or is corrupted.",
            args.image.to_string_lossy().red().bold()
        )
    })?;

    let payload = lzw::decode(&codes).with_context(|| {
        format!(
            "Failed to decompress the {} recovered codewords.",
            codes.len().to_string().red().bold()
        )
    })?;

    let base = args
        .output
        .unwrap_or_else(|| sibling_path(&args.image, EXTRACT_PREFIX, ""));
    let target = if tag.is_empty() {
        base
    } else {
        let mut name = base.into_os_string();
        name.push(".");
        name.push(tag.to_extension());
        PathBuf::from(name)
    };
    ensure_writable(&target, args.force)?;

    info!(
        tag = %tag,
        codewords = codes.len(),
        payload_bytes = payload.len(),
        "payload recovered"
    );

    fs::write(&target, payload).with_context(|| {
        format!(
            "Unable to write to target file: {}",
            target.to_string_lossy().red().bold()
        )
    })?;

    println!(
        "The file has been successfully recovered and saved: {}",
        target.to_string_lossy().green().bold()
    );
    Ok(())
}

/// 处理 'Check' 命令的执行逻辑。
///
/// 报告图像类型、尺寸以及还能嵌入多少码字。
pub fn handle_check(args: CheckArgs) -> Result<()> {
    let kind = format::detect_file(&args.image).with_context(|| {
        format!(
            "Unsupported image file: {}",
            args.image.to_string_lossy().red().bold()
        )
    })?;

    let raster = Raster::load(&args.image).with_context(|| {
        format!(
            "Unable to read image file: {}",
            args.image.to_string_lossy().red().bold()
        )
    })?;

    let bits = steganography::capacity_bits(&raster);
    println!(
        "{} is a {} image ({}x{}, {} pixels).",
        args.image.to_string_lossy().green().bold(),
        kind,
        raster.width(),
        raster.height().unsigned_abs(),
        raster.len()
    );
    println!(
        "Capacity: {} bits, {} codewords.",
        bits.to_string().green().bold(),
        (bits / CODEWORD_BITS).to_string().green().bold()
    );
    Ok(())
}
