use crate::errors::AppError;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

const READ_BUFFER: usize = 1 << 20;

/// 一行文本（含原始换行符）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    /// 从输入中消耗的原始字节数（含被丢弃的非法字节）
    pub raw_len: usize,
}

impl Line {
    /// UTF-8 编码后的字节数，用于按大小分割
    pub fn byte_len(&self) -> usize {
        self.text.len()
    }
}

/// 按行惰性读取输入文件，只能向前遍历一次
pub struct LineSource<R = File> {
    reader: BufReader<R>,
    path: PathBuf,
    size_hint: u64,
    buf: Vec<u8>,
    dropped_bytes: u64,
}

impl LineSource<File> {
    /// 打开文件；不存在或不可读时返回 NotFound，此时尚未产生任何行
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let not_found = |e: std::io::Error| AppError::NotFound(format!("{} ({})", path.display(), e));
        let file = File::open(path).map_err(not_found)?;
        let meta = file.metadata().map_err(not_found)?;
        if meta.is_dir() {
            return Err(AppError::NotFound(format!("{} is a directory", path.display())));
        }
        Ok(Self::with_size(file, path, meta.len()))
    }
}

impl<R: Read> LineSource<R> {
    pub fn with_size(inner: R, path: impl Into<PathBuf>, size_hint: u64) -> Self {
        LineSource {
            reader: BufReader::with_capacity(READ_BUFFER, inner),
            path: path.into(),
            size_hint,
            buf: Vec::new(),
            dropped_bytes: 0,
        }
    }

    /// 输入总字节数，用于计算进度百分比
    pub fn size_hint(&self) -> u64 {
        self.size_hint
    }

    /// 目前为止因无法解码而丢弃的字节数
    pub fn dropped_bytes(&self) -> u64 {
        self.dropped_bytes
    }
}

impl<R: Read> Iterator for LineSource<R> {
    type Item = Result<Line, AppError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(raw_len) => {
                let (text, dropped) = decode_ignoring_invalid(&self.buf);
                self.dropped_bytes += dropped as u64;
                Some(Ok(Line { text, raw_len }))
            }
            Err(e) => Some(Err(AppError::io(
                format!("read {}", self.path.display()),
                e,
            ))),
        }
    }
}

/// 按 UTF-8 解码，跳过非法字节序列；返回文本和被丢弃的字节数
pub fn decode_ignoring_invalid(bytes: &[u8]) -> (String, usize) {
    let mut text = String::with_capacity(bytes.len());
    let mut dropped = 0;
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
        dropped += chunk.invalid().len();
    }
    (text, dropped)
}
