use crate::config::Settings;
use crate::errors::{AppError, ErrorKind};
use crate::events::SplitSummary;
use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

const LOG_FILE: &str = "splitter.log";
const STATS_FILE: &str = "stats.log";

/// 写到 stderr，配置了日志目录时同时追加到 `splitter.log`
struct SplitLogger {
    level: LevelFilter,
    file: Option<Mutex<File>>,
}

impl Log for SplitLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let entry = format_entry(record);
        eprint!("{}", entry);
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = file.write_all(entry.as_bytes());
            }
        }
    }

    fn flush(&self) {
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = file.flush();
            }
        }
    }
}

fn format_entry(record: &Record) -> String {
    let time = Local::now().format("%Y-%m-%d %H:%M:%S");
    format!(
        "[{}] {:<5} {}: {}\n",
        time,
        record.level(),
        record.target(),
        record.args()
    )
}

fn open_append(path: &Path) -> Result<File, AppError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| AppError::io(format!("open log file {}", path.display()), e))
}

/// 安装全局日志；重复调用时保留第一次的配置
pub fn init_logger(settings: &Settings) -> Result<(), AppError> {
    let file = match &settings.log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .map_err(|e| AppError::io(format!("create log directory {}", dir.display()), e))?;
            Some(Mutex::new(open_append(&dir.join(LOG_FILE))?))
        }
        None => None,
    };
    let logger = SplitLogger {
        level: settings.log_level,
        file,
    };
    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(settings.log_level);
    }
    Ok(())
}

pub fn log_error(err: &AppError) {
    let kind = match err.kind() {
        ErrorKind::NotFound => "not-found",
        ErrorKind::InvalidArgument => "invalid-argument",
        ErrorKind::Io => "io",
        ErrorKind::Internal => "internal",
    };
    log::error!("kind={} | {}", kind, err);
}

/// 统计信息：配置了日志目录时以一行 JSON 追加到 `stats.log`
pub fn log_stats(settings: &Settings, summary: &SplitSummary) -> Result<(), AppError> {
    let record = stats_record(summary);
    match &settings.log_dir {
        Some(dir) => append_stats(&dir.join(STATS_FILE), &record),
        None => {
            log::info!("stats {}", record);
            Ok(())
        }
    }
}

fn stats_record(summary: &SplitSummary) -> String {
    let mut value = serde_json::to_value(summary).unwrap_or_default();
    if let Some(map) = value.as_object_mut() {
        map.insert(
            "time".to_string(),
            serde_json::Value::String(Local::now().to_rfc3339()),
        );
    }
    value.to_string()
}

fn append_stats(path: &Path, record: &str) -> Result<(), AppError> {
    let mut file = open_append(path)?;
    writeln!(file, "{}", record)
        .map_err(|e| AppError::io(format!("write {}", path.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RunStatus;
    use std::path::PathBuf;

    #[test]
    fn stats_are_appended_as_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            log_dir: Some(dir.path().to_path_buf()),
            ..Settings::default()
        };
        let summary = SplitSummary {
            status: RunStatus::Completed,
            total_lines: 10,
            total_parts: 3,
            total_bytes_read: 1200,
            total_bytes_written: 1200,
            percent_complete: 100.0,
            output_dir: PathBuf::from("out"),
            elapsed_ms: 4,
        };
        log_stats(&settings, &summary).unwrap();
        log_stats(&settings, &summary).unwrap();

        let text = fs::read_to_string(dir.path().join(STATS_FILE)).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["status"], "completed");
        assert_eq!(parsed["total_parts"], 3);
        assert!(parsed.get("time").is_some());
    }
}
