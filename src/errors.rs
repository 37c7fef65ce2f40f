use std::fmt;
use std::io;
use std::sync::Arc;

/// 错误种类，供前端（CLI / 交互界面）按类别展示
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    Io,
    Internal,
}

#[derive(Debug, Clone)]
pub enum AppError {
    /// 输入文件不存在或不可读
    NotFound(String),
    /// 参数错误：阈值非正、同时指定两种策略、数字无法解析等
    InvalidArgument(String),
    /// 读写失败，保留原始 io::Error
    Io {
        context: String,
        source: Arc<io::Error>,
    },
    /// 后台任务异常结束
    Internal(String),
}

impl AppError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        AppError::Io {
            context: context.into(),
            source: Arc::new(source),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        AppError::InvalidArgument(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            AppError::Io { .. } => ErrorKind::Io,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Input file not found: {}", msg),
            AppError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            AppError::Io { context, source } => write!(f, "I/O error ({}): {}", context, source),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Io { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(err: std::num::ParseIntError) -> Self {
        AppError::InvalidArgument(format!("not a number: {}", err))
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => AppError::NotFound(err.to_string()),
            _ => AppError::io("file", err),
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("split task did not finish: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn io_error_keeps_its_cause() {
        let err = AppError::io("write part 3", io::Error::new(io::ErrorKind::Other, "disk full"));
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("write part 3"));
        assert_eq!(err.source().map(|s| s.to_string()), Some("disk full".to_string()));
    }

    #[test]
    fn conversions_pick_the_right_kind() {
        let missing: AppError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert_eq!(missing.kind(), ErrorKind::NotFound);

        let parse: AppError = "abc".parse::<u64>().unwrap_err().into();
        assert_eq!(parse.kind(), ErrorKind::InvalidArgument);
    }
}
