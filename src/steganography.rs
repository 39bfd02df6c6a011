//! # 隐写核心模块
//!
//! 固定布局，每个像素只用蓝色通道的最低位承载 1 bit：
//!
//! | 像素区间                  | 内容                                      |
//! |---------------------------|-------------------------------------------|
//! | `[0, 32)`                 | 码字比特流长度 (`u32`，低位在前)          |
//! | `[32, 56)`                | 3 字节文件类型标签，第 `i` 位取自字节 `i/8` 的第 `i%8` 位 |
//! | `[56, 56 + 32 * count)`   | 码字比特流，第 `j` 位是码字 `j/32` 的第 `j%32` 位 |

use crate::constants::{CODEWORD_BITS, HEADER_PIXELS, SIZE_FIELD_PIXELS, TAG_FIELD_PIXELS, TAG_LEN};
use crate::error::{Result, StegoError};
use crate::raster::{Pixel, Raster};
use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// 设置或清除蓝色通道的最低位，其余 7 位及另外两个通道保持不变。
pub fn set_channel_bit(pixel: &mut Pixel, value: bool) {
    pixel.blue = (pixel.blue & 0xFE) | u8::from(value);
}

pub fn get_channel_bit(pixel: &Pixel) -> bool {
    pixel.blue & 1 == 1
}

/// 读取码字比特流的第 `position` 位。越过码字序列末尾时返回 `false`。
pub fn get_code_bit(codes: &[u32], position: usize) -> bool {
    codes
        .get(position / CODEWORD_BITS)
        .is_some_and(|&code| (code >> (position % CODEWORD_BITS)) & 1 == 1)
}

/// 嵌入在图像中的 3 字节文件类型标签，取自载荷文件的扩展名。
///
/// 超过 3 字节的扩展名被截断，不足 3 字节的用 `0` 补齐；读取时去掉末尾的 `0`。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileTag([u8; TAG_LEN]);

impl FileTag {
    pub fn new(tag: &[u8]) -> Self {
        let mut bytes = [0u8; TAG_LEN];
        let len = tag.len().min(TAG_LEN);
        bytes[..len].copy_from_slice(&tag[..len]);
        Self(bytes)
    }

    /// 取文件名最后一个 `.` 之后的部分。没有扩展名时得到全零标签。
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .map(|ext| Self::new(ext.as_encoded_bytes()))
            .unwrap_or_default()
    }

    /// 原始的 3 个字节，包括补齐用的 `0`。
    pub fn raw(&self) -> [u8; TAG_LEN] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        let end = self.0.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        &self.0[..end]
    }

    pub fn as_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// 可安全用作文件扩展名的形式：ASCII 字母和数字之外的字节替换为 `_`。
    pub fn to_extension(&self) -> String {
        self.as_bytes()
            .iter()
            .map(|&b| if b.is_ascii_alphanumeric() { b as char } else { '_' })
            .collect()
    }
}

impl fmt::Display for FileTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

/// 元数据之后还能承载的码字比特数。
pub fn capacity_bits(raster: &Raster) -> usize {
    raster.len().saturating_sub(HEADER_PIXELS)
}

/// 把文件类型标签和码字序列写入栅格。
///
/// 容量检查先于任何写入：失败时栅格保持原样。
///
/// # Errors
///
/// `56 + 32 * codes.len()` 超过像素数，或比特长度超出 `u32` 范围时返回 [`StegoError::Capacity`]。
pub fn embed(raster: &mut Raster, tag: &FileTag, codes: &[u32]) -> Result<()> {
    let payload_bits = codes.len() as u64 * CODEWORD_BITS as u64;
    let required = HEADER_PIXELS as u64 + payload_bits;
    let available = raster.len() as u64;
    if required > available {
        return Err(StegoError::Capacity {
            required,
            available,
        });
    }
    let bit_len = u32::try_from(payload_bits).map_err(|_| StegoError::Capacity {
        required,
        available: u64::from(u32::MAX),
    })?;

    let pixels = raster.pixels_mut();
    let (size_field, rest) = pixels.split_at_mut(SIZE_FIELD_PIXELS);
    let (tag_field, payload) = rest.split_at_mut(TAG_FIELD_PIXELS);

    for (i, pixel) in size_field.iter_mut().enumerate() {
        set_channel_bit(pixel, (bit_len >> i) & 1 == 1);
    }

    let tag = tag.raw();
    for (i, pixel) in tag_field.iter_mut().enumerate() {
        set_channel_bit(pixel, (tag[i / 8] >> (i % 8)) & 1 == 1);
    }

    for (j, pixel) in payload[..bit_len as usize].iter_mut().enumerate() {
        set_channel_bit(pixel, get_code_bit(codes, j));
    }

    debug!(codewords = codes.len(), bit_len, "embedded payload");
    Ok(())
}

/// 从栅格中读回文件类型标签和码字序列，是 [`embed`] 的精确逆过程。
///
/// # Errors
///
/// * [`StegoError::CorruptHeader`] - 栅格不足 56 个像素，或记录的比特长度超出剩余像素。
/// * [`StegoError::Allocation`] - 无法为码字分配内存。
pub fn extract(raster: &Raster) -> Result<(FileTag, Vec<u32>)> {
    let pixels = raster.pixels();
    if pixels.len() < HEADER_PIXELS {
        return Err(StegoError::CorruptHeader(format!(
            "image has {} pixels, fewer than the {HEADER_PIXELS} metadata pixels",
            pixels.len()
        )));
    }

    let bit_len = pixels[..SIZE_FIELD_PIXELS]
        .iter()
        .enumerate()
        .fold(0u32, |acc, (i, pixel)| {
            acc | (u32::from(get_channel_bit(pixel)) << i)
        }) as usize;

    let mut tag = [0u8; TAG_LEN];
    for (i, pixel) in pixels[SIZE_FIELD_PIXELS..HEADER_PIXELS].iter().enumerate() {
        tag[i / 8] |= u8::from(get_channel_bit(pixel)) << (i % 8);
    }

    let payload = &pixels[HEADER_PIXELS..];
    if bit_len > payload.len() {
        return Err(StegoError::CorruptHeader(format!(
            "embedded length of {bit_len} bits exceeds the {} available pixels",
            payload.len()
        )));
    }

    let count = bit_len.div_ceil(CODEWORD_BITS);
    let mut codes: Vec<u32> = Vec::new();
    codes.try_reserve_exact(count)?;
    codes.resize(count, 0);
    for (j, pixel) in payload[..bit_len].iter().enumerate() {
        codes[j / CODEWORD_BITS] |= u32::from(get_channel_bit(pixel)) << (j % CODEWORD_BITS);
    }

    debug!(codewords = count, bit_len, "extracted payload");
    Ok((FileTag(tag), codes))
}
