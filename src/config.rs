use crate::errors::AppError;
use crate::job::parse_count;
use crate::split::DEFAULT_PROGRESS_EVERY;
use log::LevelFilter;
use once_cell::sync::OnceCell;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_LINES_PER_PART: u64 = 1_000_000;
pub const DEFAULT_SIZE_MB: u64 = 100;

/// 运行参数，来自环境变量或 `.env`
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub default_lines: u64,
    pub default_size_mb: u64,
    pub progress_every: u64,
    pub log_dir: Option<PathBuf>,
    pub log_level: LevelFilter,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            default_lines: DEFAULT_LINES_PER_PART,
            default_size_mb: DEFAULT_SIZE_MB,
            progress_every: DEFAULT_PROGRESS_EVERY,
            log_dir: None,
            log_level: LevelFilter::Warn,
        }
    }
}

impl Settings {
    /// 加载 `.env`（如存在）后读取进程环境变量
    pub fn from_env() -> Result<Self, AppError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut settings = Settings::default();
        let number = |key: &str| -> Result<Option<u64>, AppError> {
            lookup(key)
                .map(|raw| {
                    parse_count(&raw).map_err(|e| AppError::invalid(format!("{}: {}", key, e)))
                })
                .transpose()
        };

        if let Some(lines) = number("SPLITTER_DEFAULT_LINES")? {
            settings.default_lines = lines;
        }
        if let Some(mb) = number("SPLITTER_DEFAULT_SIZE_MB")? {
            settings.default_size_mb = mb;
        }
        if let Some(every) = number("SPLITTER_PROGRESS_EVERY")? {
            settings.progress_every = every;
        }
        settings.log_dir = lookup("SPLITTER_LOG_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);
        if let Some(level) = lookup("SPLITTER_LOG_LEVEL") {
            settings.log_level = level.trim().parse().map_err(|_| {
                AppError::invalid(format!("SPLITTER_LOG_LEVEL: unknown level {:?}", level))
            })?;
        }
        Ok(settings)
    }
}

static SETTINGS: OnceCell<Settings> = OnceCell::new();

/// 进程内只加载一次
pub fn settings() -> Result<&'static Settings, AppError> {
    SETTINGS.get_or_try_init(Settings::from_env)
}
