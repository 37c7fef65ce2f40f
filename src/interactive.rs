//! 交互模式：未给出输入文件时逐步询问，最终得到一个 [`SplitJob`]。

use crate::config::Settings;
use crate::errors::AppError;
use crate::job::{BYTES_PER_MB, SplitJob, SplitPolicy, default_output_dir, parse_count};
use std::fs;
use std::io::{BufRead, Write};
use std::path::PathBuf;

const RULE: &str = "============================================================";

struct Prompter<R, W> {
    input: R,
    out: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    fn say(&mut self, text: &str) -> Result<(), AppError> {
        writeln!(self.out, "{}", text).map_err(|e| AppError::io("write prompt", e))
    }

    /// 读一行回答，去掉首尾空白和引号；输入结束视为参数错误
    fn ask(&mut self, question: &str) -> Result<String, AppError> {
        write!(self.out, "{}", question).map_err(|e| AppError::io("write prompt", e))?;
        self.out.flush().map_err(|e| AppError::io("write prompt", e))?;
        let mut answer = String::new();
        let read = self
            .input
            .read_line(&mut answer)
            .map_err(|e| AppError::io("read answer", e))?;
        if read == 0 {
            return Err(AppError::invalid("input closed"));
        }
        Ok(answer.trim().trim_matches('"').trim().to_string())
    }

    fn ask_count(&mut self, question: &str, default: u64) -> Result<u64, AppError> {
        loop {
            let answer = self.ask(question)?;
            if answer.is_empty() {
                return Ok(default);
            }
            match parse_count(&answer) {
                Ok(value) => return Ok(value),
                Err(_) => self.say("Please enter a positive number")?,
            }
        }
    }
}

pub fn prompt_job<R: BufRead, W: Write>(
    input: R,
    out: W,
    settings: &Settings,
) -> Result<SplitJob, AppError> {
    let mut p = Prompter { input, out };
    p.say(RULE)?;
    p.say("     TEXT FILE SPLITTER - Interactive Mode")?;
    p.say(RULE)?;
    p.say("")?;

    let input_path = loop {
        let answer = p.ask("Enter the path to your text file: ")?;
        if answer.is_empty() {
            p.say("Please enter a file path!")?;
            continue;
        }
        let path = PathBuf::from(&answer);
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                p.say(&format!("\nFile found: {}", name))?;
                p.say(&format!("  Size: {:.2} MB", meta.len() as f64 / BYTES_PER_MB as f64))?;
                break path;
            }
            _ => p.say(&format!("File not found: {}\nPlease try again.", answer))?,
        }
    };
    p.say("")?;

    p.say("How do you want to split the file?")?;
    p.say("1. By number of lines (recommended for large files)")?;
    p.say("2. By file size (MB)")?;
    let by_lines = loop {
        match p.ask("Enter your choice (1 or 2): ")?.as_str() {
            "1" => break true,
            "2" => break false,
            _ => p.say("Please enter 1 or 2")?,
        }
    };
    p.say("")?;

    let policy = if by_lines {
        let question = format!("Lines per file [default: {}]: ", settings.default_lines);
        let lines = p.ask_count(&question, settings.default_lines)?;
        p.say(&format!("Will split into files with {} lines each", lines))?;
        SplitPolicy::by_lines(lines)?
    } else {
        let question = format!("Size in MB [default: {}]: ", settings.default_size_mb);
        let mb = p.ask_count(&question, settings.default_size_mb)?;
        p.say(&format!("Will split into files of approximately {} MB each", mb))?;
        SplitPolicy::by_megabytes(mb)?
    };
    p.say("")?;

    let job = SplitJob::new(&input_path, policy)?;
    let default_dir = default_output_dir(&job.input_path, &job.naming.stem);
    p.say("Output directory:")?;
    p.say(&format!("  Default: {}", default_dir.display()))?;
    let custom = p.ask("Press Enter for default, or enter custom path: ")?;
    if custom.is_empty() {
        Ok(job)
    } else {
        Ok(job.with_output_dir(custom))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use std::io::Cursor;

    fn answers(lines: &[&str]) -> Cursor<Vec<u8>> {
        let script: String = lines.iter().map(|line| format!("{}\n", line)).collect();
        Cursor::new(script.into_bytes())
    }

    #[test]
    fn retries_until_answers_are_valid() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("big.log");
        fs::write(&input, "a\nb\n").unwrap();
        let quoted = format!("\"{}\"", input.display());
        let missing = dir.path().join("missing.log").display().to_string();

        let mut out = Vec::new();
        let job = prompt_job(
            answers(&["", &missing, &quoted, "3", "1", "zero", "0", "2,500", ""]),
            &mut out,
            &Settings::default(),
        )
        .unwrap();

        assert_eq!(job.input_path, input);
        assert_eq!(job.policy, SplitPolicy::ByLineCount(2_500));
        assert_eq!(job.output_dir(), dir.path().join("big_split"));
        let transcript = String::from_utf8(out).unwrap();
        assert!(transcript.contains("File not found"));
        assert!(transcript.contains("Please enter 1 or 2"));
        assert!(transcript.contains("Please enter a positive number"));
    }

    #[test]
    fn size_choice_uses_default_and_custom_directory() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("dump.txt");
        fs::write(&input, "x\n").unwrap();
        let path = input.display().to_string();
        let custom = dir.path().join("elsewhere").display().to_string();

        let job = prompt_job(
            answers(&[&path, "2", "", &custom]),
            Vec::new(),
            &Settings::default(),
        )
        .unwrap();
        assert_eq!(job.policy, SplitPolicy::ByByteSize(100 * BYTES_PER_MB));
        assert_eq!(job.output_dir(), PathBuf::from(custom));
    }

    #[test]
    fn closed_input_is_an_invalid_argument() {
        let err = prompt_job(answers(&[]), Vec::new(), &Settings::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
