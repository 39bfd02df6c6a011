//! # lzw_stego 库
//!
//! 本库包含 LZW 压缩与 LSB 隐写的核心逻辑：
//! 载荷先经 [`lzw`] 压缩为 32 位码字序列，再由 [`steganography`] 写入 [`raster`] 的蓝色通道最低位。

// 声明库包含的所有模块。

pub mod cli;
pub mod constants;
pub mod error;
pub mod format;
pub mod handler;
pub mod lzw;
pub mod raster;
pub mod steganography;

pub use error::{Result, StegoError};
