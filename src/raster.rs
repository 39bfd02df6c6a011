//! # 像素栅格读写模块
//!
//! 把 24 位 BMP 的像素数据读成一个扁平、按文件顺序排列的 [`Pixel`] 序列，并能原样写回。
//! 行的存储顺序 (自下而上或自上而下) 被视为不透明，读写过程中不做任何翻转。
//! PNG 输入交给 `image` 库解码，解码后的栅格与 BMP 来源的栅格完全等价。

use crate::constants::{BMP_FILE_HEADER_SIZE, BMP_INFO_HEADER_SIZE, BMP_MAGIC};
use crate::error::{Result, StegoError};
use crate::format::{self, ImageKind};
use image::{ImageFormat, RgbImage};
use std::fs;
use std::path::Path;
use tracing::debug;

const BMP_HEADERS_SIZE: usize = BMP_FILE_HEADER_SIZE + BMP_INFO_HEADER_SIZE;
const DEFAULT_PX_PER_METER: i32 = 2835;

/// 一个 24 位像素，字段顺序与 BMP 的内存字节顺序一致 (蓝色在前)。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pixel {
    pub blue: u8,
    pub green: u8,
    pub red: u8,
}

/// BMP 文件头与 `BITMAPINFOHEADER`，全部为小端序、无结构体填充。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BmpHeader {
    pub file_type: u16,
    pub file_size: u32,
    pub reserved1: u16,
    pub reserved2: u16,
    pub pixel_data_offset: u32,
    pub header_size: u32,
    pub width: i32,
    pub height: i32,
    pub color_planes: u16,
    pub bits_per_pixel: u16,
    pub compression: u32,
    pub image_size: u32,
    pub x_px_per_meter: i32,
    pub y_px_per_meter: i32,
    pub palette_colors: u32,
    pub important_colors: u32,
}

/// 按小端序顺序读取字段的游标。
struct LeReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl LeReader<'_> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let chunk = self
            .bytes
            .get(self.pos..self.pos + N)
            .ok_or_else(|| StegoError::Format("truncated BMP header".into()))?;
        self.pos += N;
        let mut out = [0u8; N];
        out.copy_from_slice(chunk);
        Ok(out)
    }

    fn u16(&mut self) -> Result<u16> {
        self.take().map(u16::from_le_bytes)
    }

    fn u32(&mut self) -> Result<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn i32(&mut self) -> Result<i32> {
        self.take().map(i32::from_le_bytes)
    }
}

impl BmpHeader {
    /// 为给定尺寸构造一个未压缩 24 位 BMP 的头部。
    ///
    /// `height` 为负表示自上而下存储的行，PNG 来源的栅格使用这种形式以保持行顺序。
    pub fn for_dimensions(width: i32, height: i32) -> Self {
        let mut header = Self {
            file_type: BMP_MAGIC,
            file_size: 0,
            reserved1: 0,
            reserved2: 0,
            pixel_data_offset: BMP_HEADERS_SIZE as u32,
            header_size: BMP_INFO_HEADER_SIZE as u32,
            width,
            height,
            color_planes: 1,
            bits_per_pixel: 24,
            compression: 0,
            image_size: 0,
            x_px_per_meter: DEFAULT_PX_PER_METER,
            y_px_per_meter: DEFAULT_PX_PER_METER,
            palette_colors: 0,
            important_colors: 0,
        };
        let image_size = (header.stride() * header.rows()) as u32;
        header.image_size = image_size;
        header.file_size = BMP_HEADERS_SIZE as u32 + image_size;
        header
    }

    /// 从文件开头解析两个头部，并确认这是一个未压缩的 24 位 BMP。
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut r = LeReader { bytes, pos: 0 };
        let header = Self {
            file_type: r.u16()?,
            file_size: r.u32()?,
            reserved1: r.u16()?,
            reserved2: r.u16()?,
            pixel_data_offset: r.u32()?,
            header_size: r.u32()?,
            width: r.i32()?,
            height: r.i32()?,
            color_planes: r.u16()?,
            bits_per_pixel: r.u16()?,
            compression: r.u32()?,
            image_size: r.u32()?,
            x_px_per_meter: r.i32()?,
            y_px_per_meter: r.i32()?,
            palette_colors: r.u32()?,
            important_colors: r.u32()?,
        };

        if header.file_type != BMP_MAGIC {
            return Err(StegoError::Format("missing BM signature".into()));
        }
        if header.bits_per_pixel != 24 || header.compression != 0 {
            return Err(StegoError::Format(format!(
                "BMP is {}-bit with compression {}, expected uncompressed 24-bit",
                header.bits_per_pixel, header.compression
            )));
        }
        if header.width <= 0 || header.height == 0 {
            return Err(StegoError::Format(format!(
                "invalid BMP dimensions {}x{}",
                header.width, header.height
            )));
        }
        if (header.pixel_data_offset as usize) < BMP_HEADERS_SIZE {
            return Err(StegoError::Format(format!(
                "pixel data offset {} overlaps the headers",
                header.pixel_data_offset
            )));
        }
        Ok(header)
    }

    /// 序列化为 54 字节的头部。
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(BMP_HEADERS_SIZE);
        out.extend_from_slice(&self.file_type.to_le_bytes());
        out.extend_from_slice(&self.file_size.to_le_bytes());
        out.extend_from_slice(&self.reserved1.to_le_bytes());
        out.extend_from_slice(&self.reserved2.to_le_bytes());
        out.extend_from_slice(&self.pixel_data_offset.to_le_bytes());
        out.extend_from_slice(&self.header_size.to_le_bytes());
        out.extend_from_slice(&self.width.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        out.extend_from_slice(&self.color_planes.to_le_bytes());
        out.extend_from_slice(&self.bits_per_pixel.to_le_bytes());
        out.extend_from_slice(&self.compression.to_le_bytes());
        out.extend_from_slice(&self.image_size.to_le_bytes());
        out.extend_from_slice(&self.x_px_per_meter.to_le_bytes());
        out.extend_from_slice(&self.y_px_per_meter.to_le_bytes());
        out.extend_from_slice(&self.palette_colors.to_le_bytes());
        out.extend_from_slice(&self.important_colors.to_le_bytes());
        out
    }

    /// 每行的像素数。
    pub fn columns(&self) -> usize {
        self.width.unsigned_abs() as usize
    }

    /// 行数，即 `|height|`。
    pub fn rows(&self) -> usize {
        self.height.unsigned_abs() as usize
    }

    /// 每行末尾的填充字节数，使行长度对齐到 4 字节。
    pub fn row_padding(&self) -> usize {
        (4 - (self.columns() * 3) % 4) % 4
    }

    /// 每行在文件中占用的字节数 (含填充)。
    pub fn stride(&self) -> usize {
        self.columns() * 3 + self.row_padding()
    }
}

/// 一幅 24 位图像的像素栅格，连同用于原样写回的头部信息。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    header: BmpHeader,
    /// 54 字节头部与像素数据之间的字节 (扩展信息头、调色板等)，原样保留。
    extra: Vec<u8>,
    pixels: Vec<Pixel>,
}

impl Raster {
    /// 创建一个全零像素、自下而上存储的 24 位栅格。
    pub fn blank(width: u32, height: u32) -> Self {
        let header = BmpHeader::for_dimensions(width as i32, height as i32);
        let pixels = vec![Pixel::default(); header.columns() * header.rows()];
        Self {
            header,
            extra: Vec::new(),
            pixels,
        }
    }

    /// 读取并校验图像文件。PNG 经 `image` 库解码，BMP 则直接解析。
    ///
    /// # Errors
    ///
    /// * [`StegoError::Io`] - 文件无法读取。
    /// * [`StegoError::Format`] - 不是受支持的格式，或像素数据被截断。
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let raster = match format::detect(&bytes)? {
            ImageKind::Bmp24 => Self::from_bmp_bytes(&bytes)?,
            ImageKind::Png24 => Self::from_png_bytes(&bytes)?,
        };
        debug!(
            path = %path.display(),
            width = raster.header.width,
            height = raster.header.height,
            pixels = raster.pixels.len(),
            "loaded raster"
        );
        Ok(raster)
    }

    /// 解析一个完整的 BMP 文件。逐行读取 `width` 个像素并丢弃行尾填充。
    pub fn from_bmp_bytes(bytes: &[u8]) -> Result<Self> {
        let header = BmpHeader::parse(bytes)?;
        let offset = header.pixel_data_offset as usize;
        let extra = bytes
            .get(BMP_HEADERS_SIZE..offset)
            .ok_or_else(|| StegoError::Format("file ends before the pixel data offset".into()))?
            .to_vec();

        let columns = header.columns();
        let rows = header.rows();
        let count = columns
            .checked_mul(rows)
            .ok_or_else(|| StegoError::Format("image dimensions overflow".into()))?;
        let mut pixels: Vec<Pixel> = Vec::new();
        pixels.try_reserve_exact(count)?;

        let stride = header.stride();
        for row in 0..rows {
            let start = offset + row * stride;
            let data = bytes.get(start..start + columns * 3).ok_or_else(|| {
                StegoError::Format(format!("pixel data truncated at row {row} of {rows}"))
            })?;
            pixels.extend(data.chunks_exact(3).map(|c| Pixel {
                blue: c[0],
                green: c[1],
                red: c[2],
            }));
        }

        Ok(Self {
            header,
            extra,
            pixels,
        })
    }

    /// 通过 `image` 库解码 8 位 RGB PNG，并为其合成一个自上而下的 BMP 头部。
    pub fn from_png_bytes(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Png)?.to_rgb8();
        let (width, height) = decoded.dimensions();
        let (width, height) = match (i32::try_from(width), i32::try_from(height)) {
            (Ok(w), Ok(h)) if w > 0 && h > 0 => (w, h),
            _ => {
                return Err(StegoError::Format(format!(
                    "unsupported PNG dimensions {width}x{height}"
                )));
            }
        };

        let mut pixels: Vec<Pixel> = Vec::new();
        pixels.try_reserve_exact(decoded.len() / 3)?;
        pixels.extend(decoded.pixels().map(|p| {
            let [red, green, blue] = p.0;
            Pixel { blue, green, red }
        }));

        Ok(Self {
            header: BmpHeader::for_dimensions(width, -height),
            extra: Vec::new(),
            pixels,
        })
    }

    /// 头部原样写出，随后逐行写出像素并补零填充。
    ///
    /// # Panics
    ///
    /// 像素数量与头部描述的尺寸不一致时 panic，这属于调用方违反约定。
    pub fn to_bmp_bytes(&self) -> Vec<u8> {
        let columns = self.header.columns();
        let rows = self.header.rows();
        assert_eq!(
            self.pixels.len(),
            columns * rows,
            "raster does not match its header dimensions"
        );

        let padding = [0u8; 3];
        let mut out = self.header.to_bytes();
        out.extend_from_slice(&self.extra);
        out.reserve(self.header.stride() * rows);
        for row in self.pixels.chunks_exact(columns) {
            for pixel in row {
                out.extend_from_slice(&[pixel.blue, pixel.green, pixel.red]);
            }
            out.extend_from_slice(&padding[..self.header.row_padding()]);
        }
        out
    }

    /// 以栅格顺序输出一幅 RGB8 图像 (第一个像素位于左上角)。
    pub fn to_rgb_image(&self) -> Result<RgbImage> {
        let width = self.header.columns() as u32;
        let height = self.header.rows() as u32;
        let mut buffer: Vec<u8> = Vec::new();
        buffer.try_reserve_exact(self.pixels.len() * 3)?;
        for pixel in &self.pixels {
            buffer.extend_from_slice(&[pixel.red, pixel.green, pixel.blue]);
        }
        RgbImage::from_raw(width, height, buffer)
            .ok_or_else(|| StegoError::Format("raster does not match its header dimensions".into()))
    }

    /// 保存栅格。目标扩展名为 `png` 时写出 RGB8 PNG，否则写出 BMP。
    ///
    /// 不做原子替换：失败时目标文件可能只写了一部分。
    pub fn save(&self, path: &Path) -> Result<()> {
        let as_png = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
        if as_png {
            self.to_rgb_image()?.save_with_format(path, ImageFormat::Png)?;
        } else {
            fs::write(path, self.to_bmp_bytes())?;
        }
        debug!(path = %path.display(), png = as_png, "saved raster");
        Ok(())
    }

    pub fn header(&self) -> &BmpHeader {
        &self.header
    }

    pub fn width(&self) -> i32 {
        self.header.width
    }

    pub fn height(&self) -> i32 {
        self.header.height
    }

    pub fn pixel_data_offset(&self) -> u32 {
        self.header.pixel_data_offset
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Pixel] {
        &mut self.pixels
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}
