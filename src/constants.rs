/// 嵌入的码字比特流长度字段所占的像素数。
/// 长度为 `u32`，每个像素只在蓝色通道的最低位存储 1 bit，因此需要 32 个像素。
pub const SIZE_FIELD_PIXELS: usize = 32;

/// 文件类型标签所占的像素数 (3 字节 × 8 bits)。
pub const TAG_FIELD_PIXELS: usize = TAG_LEN * 8;

/// 文件类型标签的固定字节数。
pub const TAG_LEN: usize = 3;

/// 元数据区域 (长度字段 + 标签) 的总像素数，码字从此处开始写入。
pub const HEADER_PIXELS: usize = SIZE_FIELD_PIXELS + TAG_FIELD_PIXELS;

/// 每个 LZW 码字在比特流中占用的固定位宽。
/// 码字不按自然位宽打包，嵌入布局依赖于这个常量。
pub const CODEWORD_BITS: usize = 32;

/// LZW 字典的最大条目数 (包括 0..=255 的单字节条目)。
/// 字典写满后编码器与解码器都停止插入新条目。
pub const DICTIONARY_CAPACITY: usize = 65536;

/// 初始化时预置的单字节条目数量。
pub const SINGLE_BYTE_CODES: usize = 256;

/// BMP 文件头 (`BITMAPFILEHEADER`) 的字节数。
pub const BMP_FILE_HEADER_SIZE: usize = 14;

/// BMP 信息头 (`BITMAPINFOHEADER`) 的字节数。
pub const BMP_INFO_HEADER_SIZE: usize = 40;

/// BMP 文件的魔数 `"BM"`。
pub const BMP_MAGIC: u16 = 0x4D42;

/// 嵌入输出的默认文件名前缀。
pub const EMBED_PREFIX: &str = "doctored_";

/// 提取输出的默认文件名前缀。
pub const EXTRACT_PREFIX: &str = "recovered_";
