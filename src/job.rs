use crate::errors::AppError;
use std::path::{Path, PathBuf};

pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// 解析正整数，允许 `1,000,000` / `1_000_000` 这类分组写法
pub fn parse_count(raw: &str) -> Result<u64, AppError> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '_')
        .collect();
    if cleaned.is_empty() {
        return Err(AppError::invalid(format!("expected a number, got {:?}", raw)));
    }
    let value: u64 = cleaned.parse()?;
    if value == 0 {
        return Err(AppError::invalid("value must be a positive number"));
    }
    Ok(value)
}

/// 分割策略，每个任务只能有一种
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitPolicy {
    ByLineCount(u64),
    ByByteSize(u64),
}

impl SplitPolicy {
    pub fn by_lines(lines: u64) -> Result<Self, AppError> {
        if lines == 0 {
            return Err(AppError::invalid("lines per part must be at least 1"));
        }
        Ok(SplitPolicy::ByLineCount(lines))
    }

    pub fn by_bytes(max_bytes: u64) -> Result<Self, AppError> {
        if max_bytes == 0 {
            return Err(AppError::invalid("part size must be at least 1 byte"));
        }
        Ok(SplitPolicy::ByByteSize(max_bytes))
    }

    pub fn by_megabytes(mb: u64) -> Result<Self, AppError> {
        if mb == 0 {
            return Err(AppError::invalid("part size must be at least 1 MB"));
        }
        let bytes = mb
            .checked_mul(BYTES_PER_MB)
            .ok_or_else(|| AppError::invalid(format!("{} MB is too large", mb)))?;
        Self::by_bytes(bytes)
    }

    /// 由命令行选项决定策略；都未指定时按默认行数分割
    pub fn from_options(
        lines: Option<u64>,
        size_mb: Option<u64>,
        default_lines: u64,
    ) -> Result<Self, AppError> {
        match (lines, size_mb) {
            (Some(_), Some(_)) => Err(AppError::invalid(
                "cannot split by both lines and size; choose one method",
            )),
            (Some(n), None) => Self::by_lines(n),
            (None, Some(mb)) => Self::by_megabytes(mb),
            (None, None) => Self::by_lines(default_lines),
        }
    }
}

/// 分片文件命名：`{stem}_part_{NNNN}{ext}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartNaming {
    pub dir: PathBuf,
    pub stem: String,
    /// 含前导点，例如 `.txt`；无扩展名时为空
    pub ext: String,
}

impl PartNaming {
    pub fn file_name(&self, index: u32) -> String {
        format!("{}_part_{:04}{}", self.stem, index, self.ext)
    }

    pub fn path(&self, index: u32) -> PathBuf {
        self.dir.join(self.file_name(index))
    }

    /// 前 `count` 个分片的路径，按序号升序
    pub fn paths(&self, count: u32) -> impl Iterator<Item = PathBuf> + '_ {
        (1..=count).map(move |index| self.path(index))
    }
}

/// 一次分割任务的完整描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitJob {
    pub input_path: PathBuf,
    /// 输出目录只保存在 `naming.dir` 中，通过 [`SplitJob::output_dir`] 读取
    pub naming: PartNaming,
    pub policy: SplitPolicy,
}

impl SplitJob {
    /// 输出目录默认为 `{父目录}/{stem}_split`
    pub fn new(input_path: impl Into<PathBuf>, policy: SplitPolicy) -> Result<Self, AppError> {
        let input_path = input_path.into();
        let (stem, ext) = stem_and_ext(&input_path)?;
        let dir = default_output_dir(&input_path, &stem);
        Ok(SplitJob {
            naming: PartNaming { dir, stem, ext },
            input_path,
            policy,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.naming.dir
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.naming.dir = dir.into();
        self
    }

    pub fn with_optional_output_dir(self, dir: Option<PathBuf>) -> Self {
        match dir {
            Some(dir) => self.with_output_dir(dir),
            None => self,
        }
    }
}

pub fn default_output_dir(input: &Path, stem: &str) -> PathBuf {
    let parent = input.parent().unwrap_or_else(|| Path::new(""));
    parent.join(format!("{}_split", stem))
}

fn stem_and_ext(input: &Path) -> Result<(String, String), AppError> {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            AppError::invalid(format!("input path has no file name: {}", input.display()))
        })?;
    let ext = input
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    Ok((stem, ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_count_accepts_grouped_digits() {
        assert_eq!(parse_count("1,000,000").unwrap(), 1_000_000);
        assert_eq!(parse_count(" 5_000 ").unwrap(), 5_000);
        assert!(parse_count("0").is_err());
        assert!(parse_count("-3").is_err());
        assert!(parse_count("ten").is_err());
        assert!(parse_count("").is_err());
    }

    #[test]
    fn policy_from_options() {
        assert_eq!(
            SplitPolicy::from_options(None, None, 1_000_000).unwrap(),
            SplitPolicy::ByLineCount(1_000_000)
        );
        assert_eq!(
            SplitPolicy::from_options(None, Some(2), 10).unwrap(),
            SplitPolicy::ByByteSize(2 * BYTES_PER_MB)
        );
        assert!(SplitPolicy::from_options(Some(1), Some(1), 10).is_err());
        assert!(SplitPolicy::from_options(Some(0), None, 10).is_err());
    }

    #[test]
    fn naming_and_default_output_dir() {
        let job = SplitJob::new("/data/logs/big.tar.gz", SplitPolicy::ByLineCount(5)).unwrap();
        assert_eq!(job.output_dir(), Path::new("/data/logs/big.tar_split"));
        assert_eq!(job.naming.file_name(1), "big.tar_part_0001.gz");
        assert_eq!(
            job.naming.path(12),
            PathBuf::from("/data/logs/big.tar_split/big.tar_part_0012.gz")
        );

        let job = SplitJob::new("README", SplitPolicy::ByLineCount(5))
            .unwrap()
            .with_output_dir("out");
        assert_eq!(job.naming.path(3), PathBuf::from("out/README_part_0003"));
        assert_eq!(job.output_dir(), Path::new("out"));
    }

    #[test]
    fn output_dir_override_moves_every_part_path() {
        let job = SplitJob::new("/in/data.txt", SplitPolicy::ByLineCount(5))
            .unwrap()
            .with_output_dir("/elsewhere")
            .with_optional_output_dir(Some(PathBuf::from("/final")));
        assert_eq!(job.output_dir(), Path::new("/final"));
        let paths: Vec<PathBuf> = job.naming.paths(2).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/final/data_part_0001.txt"),
                PathBuf::from("/final/data_part_0002.txt"),
            ]
        );
        assert_eq!(job.naming.paths(0).count(), 0);
    }

    #[test]
    fn input_without_file_name_is_rejected() {
        assert!(SplitJob::new("/", SplitPolicy::ByLineCount(1)).is_err());
    }
}
