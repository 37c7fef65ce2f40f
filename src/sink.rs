use crate::errors::AppError;
use crate::job::PartNaming;
use crate::source::Line;
use log::debug;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const WRITE_BUFFER: usize = 1 << 20;

/// 单个分片的写入端；`close` 消耗自身，保证每个分片只关闭一次
pub trait PartSink: Send {
    fn path(&self) -> &Path;

    fn write_line(&mut self, line: &Line) -> Result<(), AppError>;

    fn close(self: Box<Self>) -> Result<(), AppError>;
}

/// 按序号创建分片
pub trait PartFactory: Send {
    fn open(&mut self, index: u32) -> Result<Box<dyn PartSink>, AppError>;
}

pub struct FilePartSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FilePartSink {
    /// 已存在的同名文件会被覆盖
    pub fn create(path: PathBuf) -> Result<Self, AppError> {
        let file = File::create(&path)
            .map_err(|e| AppError::io(format!("create {}", path.display()), e))?;
        Ok(FilePartSink {
            path,
            writer: BufWriter::with_capacity(WRITE_BUFFER, file),
        })
    }
}

impl PartSink for FilePartSink {
    fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&mut self, line: &Line) -> Result<(), AppError> {
        self.writer
            .write_all(line.text.as_bytes())
            .map_err(|e| AppError::io(format!("write {}", self.path.display()), e))
    }

    fn close(self: Box<Self>) -> Result<(), AppError> {
        let FilePartSink { path, writer } = *self;
        let file = writer
            .into_inner()
            .map_err(|e| AppError::io(format!("flush {}", path.display()), e.into_error()))?;
        file.sync_all()
            .map_err(|e| AppError::io(format!("sync {}", path.display()), e))?;
        debug!("closed {}", path.display());
        Ok(())
    }
}

/// 在输出目录中按命名模板创建分片文件
pub struct FilePartFactory {
    naming: PartNaming,
}

impl FilePartFactory {
    pub fn new(naming: PartNaming) -> Self {
        FilePartFactory { naming }
    }
}

impl PartFactory for FilePartFactory {
    fn open(&mut self, index: u32) -> Result<Box<dyn PartSink>, AppError> {
        Ok(Box::new(FilePartSink::create(self.naming.path(index))?))
    }
}
