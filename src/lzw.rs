//! # LZW 编解码模块
//!
//! 字典在每次 [`encode`] / [`decode`] 调用内部新建，调用结束即释放，调用之间不共享任何状态。
//! 编码器与解码器按完全相同的顺序为相同的字节串分配相同的码，
//! 因此字典本身从不需要随码字流一起传输。

use crate::constants::{DICTIONARY_CAPACITY, SINGLE_BYTE_CODES};
use crate::error::{Result, StegoError};
use std::collections::HashMap;
use std::mem;
use tracing::debug;

/// 码表：码 -> 字节串，按插入顺序分配码。
///
/// 编码侧额外维护一份字节串 -> 码的哈希索引以替代线性扫描，
/// 这只改变查找复杂度，不改变码的分配顺序。
#[derive(Debug)]
struct Dictionary {
    entries: Vec<Vec<u8>>,
    index: Option<HashMap<Vec<u8>, u32>>,
    capacity: usize,
}

impl Dictionary {
    fn new(capacity: usize, indexed: bool) -> Self {
        let capacity = capacity.clamp(SINGLE_BYTE_CODES, u32::MAX as usize);
        let mut dictionary = Self {
            entries: Vec::with_capacity(capacity.min(DICTIONARY_CAPACITY)),
            index: indexed.then(HashMap::new),
            capacity,
        };
        for byte in 0..=u8::MAX {
            dictionary.insert(vec![byte]);
        }
        dictionary
    }

    fn for_encoding(capacity: usize) -> Self {
        Self::new(capacity, true)
    }

    fn for_decoding(capacity: usize) -> Self {
        Self::new(capacity, false)
    }

    fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// 下一个空闲码。
    fn next_code(&self) -> u32 {
        self.entries.len() as u32
    }

    fn get(&self, code: u32) -> Option<&[u8]> {
        self.entries.get(code as usize).map(Vec::as_slice)
    }

    fn code_of(&self, bytes: &[u8]) -> Option<u32> {
        self.index.as_ref()?.get(bytes).copied()
    }

    /// 以下一个空闲码插入 `bytes`。字典已满时静默忽略。
    fn insert(&mut self, bytes: Vec<u8>) {
        if self.is_full() {
            return;
        }
        let code = self.next_code();
        if let Some(index) = self.index.as_mut() {
            index.insert(bytes.clone(), code);
        }
        self.entries.push(bytes);
    }
}

/// 使用默认容量 [`DICTIONARY_CAPACITY`] 压缩 `input`。
///
/// 相同的输入总是产生相同的码字序列；空输入得到空序列。
///
/// # Errors
///
/// 仅在无法为输出分配内存时返回 [`StegoError::Allocation`]。
pub fn encode(input: &[u8]) -> Result<Vec<u32>> {
    encode_with_capacity(input, DICTIONARY_CAPACITY)
}

/// 使用指定的字典容量压缩 `input`。容量小于 256 时按 256 处理。
///
/// 字典写满后不再插入新条目，但仍继续匹配已有条目并输出码字。
pub fn encode_with_capacity(input: &[u8], capacity: usize) -> Result<Vec<u32>> {
    let mut dictionary = Dictionary::for_encoding(capacity);
    let mut codes: Vec<u32> = Vec::new();
    codes.try_reserve(input.len() / 2 + 1)?;

    let mut current: Vec<u8> = Vec::new();
    // `current` 非空时它在字典中的码。
    let mut current_code: u32 = 0;

    for &byte in input {
        current.push(byte);
        match dictionary.code_of(&current) {
            Some(code) => current_code = code,
            None => {
                codes.push(current_code);
                dictionary.insert(mem::replace(&mut current, vec![byte]));
                current_code = u32::from(byte);
            }
        }
    }

    if !current.is_empty() {
        codes.push(current_code);
    }

    debug!(
        input_bytes = input.len(),
        codewords = codes.len(),
        dictionary_entries = dictionary.entries.len(),
        full = dictionary.is_full(),
        "LZW encode finished"
    );
    Ok(codes)
}

/// 使用默认容量 [`DICTIONARY_CAPACITY`] 解压 `codes`。
///
/// 对任意输入 `x` 都满足 `decode(&encode(x)?)? == x`。
///
/// # Errors
///
/// * [`StegoError::CorruptStream`] - 码字既不在字典中，也不是紧随其后将被分配的那个码。
/// * [`StegoError::Allocation`] - 无法为输出分配内存。
pub fn decode(codes: &[u32]) -> Result<Vec<u8>> {
    decode_with_capacity(codes, DICTIONARY_CAPACITY)
}

/// 使用指定的字典容量解压 `codes`，容量必须与编码时一致。
pub fn decode_with_capacity(codes: &[u32], capacity: usize) -> Result<Vec<u8>> {
    let mut output: Vec<u8> = Vec::new();
    let Some((&first, rest)) = codes.split_first() else {
        return Ok(output);
    };

    let mut dictionary = Dictionary::for_decoding(capacity);
    output.try_reserve(codes.len())?;

    let mut previous = dictionary
        .get(first)
        .ok_or(StegoError::CorruptStream { code: first, index: 0 })?
        .to_vec();
    output.extend_from_slice(&previous);

    for (offset, &code) in rest.iter().enumerate() {
        let current = match dictionary.get(code) {
            Some(entry) => entry.to_vec(),
            // 编码器在上一步刚分配了这个码，解码器这边还没来得及插入。
            None if code == dictionary.next_code() && !dictionary.is_full() => {
                let mut entry = previous.clone();
                entry.push(previous[0]);
                entry
            }
            None => {
                return Err(StegoError::CorruptStream {
                    code,
                    index: offset + 1,
                });
            }
        };

        output.try_reserve(current.len())?;
        output.extend_from_slice(&current);

        let mut entry = previous;
        entry.push(current[0]);
        dictionary.insert(entry);
        previous = current;
    }

    debug!(
        codewords = codes.len(),
        output_bytes = output.len(),
        dictionary_entries = dictionary.entries.len(),
        "LZW decode finished"
    );
    Ok(output)
}
