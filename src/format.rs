//! # 图像格式校验模块
//!
//! 在读取像素数据之前确认输入是 24 位 BMP 或 8 位 RGB PNG (无 alpha、无调色板)。

use crate::error::{Result, StegoError};
use image::ImageFormat;
use std::fmt;
use std::fs;
use std::path::Path;

/// 支持的输入图像类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// 24 位、未压缩的 BMP。
    Bmp24,
    /// 8 位深度、RGB 颜色类型的 PNG。
    Png24,
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageKind::Bmp24 => write!(f, "24-bit BMP"),
            ImageKind::Png24 => write!(f, "24-bit RGB PNG"),
        }
    }
}

// BITMAPINFOHEADER 中 bitsPerPixel 与 compression 字段的文件偏移。
const BMP_BITS_OFFSET: usize = 28;
const BMP_COMPRESSION_OFFSET: usize = 30;

// IHDR 是 PNG 签名之后的第一个块，位深与颜色类型紧随宽高之后。
const PNG_IHDR_TYPE: std::ops::Range<usize> = 12..16;
const PNG_BIT_DEPTH_OFFSET: usize = 24;
const PNG_COLOR_TYPE_OFFSET: usize = 25;
const PNG_COLOR_TYPE_RGB: u8 = 2;

/// 根据文件内容 (魔数与头部字段) 判断图像类型。
///
/// # Errors
///
/// 既不是 BMP 也不是 PNG，或者颜色深度不是 24 位 RGB 时返回 [`StegoError::Format`]。
pub fn detect(bytes: &[u8]) -> Result<ImageKind> {
    let format = image::guess_format(bytes)
        .map_err(|_| StegoError::Format("neither a PNG nor a BMP file".into()))?;

    match format {
        ImageFormat::Bmp => {
            let bits = read_u16(bytes, BMP_BITS_OFFSET)?;
            let compression = read_u32(bytes, BMP_COMPRESSION_OFFSET)?;
            if bits != 24 || compression != 0 {
                return Err(StegoError::Format(format!(
                    "BMP is {bits}-bit with compression {compression}, expected uncompressed 24-bit"
                )));
            }
            Ok(ImageKind::Bmp24)
        }
        ImageFormat::Png => {
            if bytes.get(PNG_IHDR_TYPE) != Some(b"IHDR".as_slice()) {
                return Err(StegoError::Format("PNG is missing its IHDR chunk".into()));
            }
            let (depth, color) = match (
                bytes.get(PNG_BIT_DEPTH_OFFSET),
                bytes.get(PNG_COLOR_TYPE_OFFSET),
            ) {
                (Some(&depth), Some(&color)) => (depth, color),
                _ => return Err(StegoError::Format("truncated PNG header".into())),
            };
            if depth != 8 || color != PNG_COLOR_TYPE_RGB {
                return Err(StegoError::Format(format!(
                    "PNG has bit depth {depth} and color type {color}, expected 8-bit RGB"
                )));
            }
            Ok(ImageKind::Png24)
        }
        other => Err(StegoError::Format(format!(
            "{other:?} images are not supported, only BMP and PNG"
        ))),
    }
}

/// 读取文件并调用 [`detect`]。
pub fn detect_file(path: &Path) -> Result<ImageKind> {
    let bytes = fs::read(path)?;
    detect(&bytes)
}

fn read_u16(bytes: &[u8], offset: usize) -> Result<u16> {
    bytes
        .get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| StegoError::Format("truncated BMP header".into()))
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32> {
    bytes
        .get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| StegoError::Format("truncated BMP header".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Raster;

    fn png_header(depth: u8, color: u8) -> Vec<u8> {
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.extend_from_slice(&13u32.to_be_bytes());
        bytes.extend_from_slice(b"IHDR");
        bytes.extend_from_slice(&4u32.to_be_bytes());
        bytes.extend_from_slice(&4u32.to_be_bytes());
        bytes.extend_from_slice(&[depth, color, 0, 0, 0]);
        bytes
    }

    #[test]
    fn test_detects_24bit_bmp() {
        let bytes = Raster::blank(4, 4).to_bmp_bytes();
        assert_eq!(detect(&bytes).unwrap(), ImageKind::Bmp24);
    }

    #[test]
    fn test_rejects_other_bmp_depths() {
        let mut bytes = Raster::blank(4, 4).to_bmp_bytes();
        bytes[BMP_BITS_OFFSET..BMP_BITS_OFFSET + 2].copy_from_slice(&32u16.to_le_bytes());
        assert!(matches!(detect(&bytes), Err(StegoError::Format(_))));
    }

    #[test]
    fn test_png_color_type() {
        assert_eq!(detect(&png_header(8, 2)).unwrap(), ImageKind::Png24);
        // RGBA
        assert!(detect(&png_header(8, 6)).is_err());
        // 调色板
        assert!(detect(&png_header(8, 3)).is_err());
        assert!(detect(&png_header(16, 2)).is_err());
    }

    #[test]
    fn test_rejects_unknown_container() {
        assert!(matches!(
            detect(b"definitely not an image"),
            Err(StegoError::Format(_))
        ));
        assert!(detect(b"BM").is_err());
    }
}
