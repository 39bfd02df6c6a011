//! # 错误类型模块
//!
//! 库内部的所有失败都归入 [`StegoError`]。命令行层再用 `anyhow` 为其附加上下文。

use std::collections::TryReserveError;
use std::io;
use thiserror::Error;

/// 编解码、像素读写与隐写过程中可能出现的错误。
///
/// 字典写满不属于错误：编码器和解码器都会在不插入新条目的情况下继续工作。
#[derive(Debug, Error)]
pub enum StegoError {
    /// 容器不是 24 位 BMP / RGB8 PNG，或像素数据被截断。
    #[error("Unsupported or malformed image: {0}")]
    Format(String),

    #[error("I/O failure: {0}")]
    Io(#[from] io::Error),

    /// 外部 PNG 解码/编码库报告的错误。
    #[error("Image codec failure: {0}")]
    Image(#[from] image::ImageError),

    /// 码字比特流放不进图像的可用容量。
    #[error("Not enough space in the image. Required: {required} bits, Available: {available} bits")]
    Capacity { required: u64, available: u64 },

    #[error("Memory allocation failed: {0}")]
    Allocation(#[from] TryReserveError),

    /// 解码器遇到一个既不在字典中、也不是下一个空闲码的码字。
    #[error("Corrupt codeword stream: code {code} at index {index} is not decodable")]
    CorruptStream { code: u32, index: usize },

    /// 图像中嵌入的元数据与图像本身不一致。
    #[error("Corrupt embedded header: {0}")]
    CorruptHeader(String),
}

pub type Result<T> = std::result::Result<T, StegoError>;
