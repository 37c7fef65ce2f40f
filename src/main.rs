use clap::Parser;
use futures::StreamExt;
use line_splitter::config::{self, Settings};
use line_splitter::job::{BYTES_PER_MB, parse_count};
use line_splitter::{
    AppError, Event, Outcome, SplitJob, SplitPolicy, SplitSummary, interactive, logger, start_job,
};
use std::path::PathBuf;
use std::process::ExitCode;

const EXAMPLES: &str = "\
Examples:
  # Interactive mode (asks questions)
  line-splitter

  # Split by lines (default: 1 million lines per file)
  line-splitter input.txt

  # Split into files with 5 million lines each
  line-splitter input.txt -l 5000000

  # Split by size (100 MB per file)
  line-splitter input.txt -s 100

  # Custom output directory
  line-splitter input.txt -o ./output_folder";

/// 被 Ctrl-C 取消时的退出码
const EXIT_CANCELLED: u8 = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignalAction {
    /// 第一次：协作取消，等当前行写完
    Cancel,
    /// 再次按下：不再等待，直接退出
    ForceQuit,
}

#[derive(Debug, Default)]
struct Interrupts {
    seen: u32,
}

impl Interrupts {
    fn on_signal(&mut self) -> SignalAction {
        self.seen += 1;
        if self.seen == 1 {
            SignalAction::Cancel
        } else {
            SignalAction::ForceQuit
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "line-splitter",
    version,
    about = "Split large text files into smaller chunks",
    after_help = EXAMPLES
)]
struct Cli {
    #[arg(help = "Path to the input text file (omit for interactive mode)")]
    input: Option<PathBuf>,

    #[arg(
        short,
        long,
        value_name = "N",
        value_parser = parse_count,
        conflicts_with = "size",
        help = "Split by number of lines per file"
    )]
    lines: Option<u64>,

    #[arg(
        short,
        long,
        value_name = "MB",
        value_parser = parse_count,
        help = "Split by size in megabytes per file"
    )]
    size: Option<u64>,

    #[arg(short, long, value_name = "DIR", help = "Output directory for split files")]
    output: Option<PathBuf>,

    #[arg(long, help = "Print the final summary as JSON instead of progress text")]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match config::settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = logger::init_logger(settings) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli, settings).await {
        Ok(code) => code,
        Err(e) => {
            logger::log_error(&e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, settings: &'static Settings) -> Result<ExitCode, AppError> {
    let json = cli.json;
    let job = match cli.input {
        Some(input) => {
            let policy = SplitPolicy::from_options(cli.lines, cli.size, settings.default_lines)?;
            SplitJob::new(input, policy)?.with_optional_output_dir(cli.output)
        }
        // 交互输入会阻塞，放到阻塞线程池
        None => {
            tokio::task::spawn_blocking(move || {
                let stdin = std::io::stdin();
                interactive::prompt_job(stdin.lock(), std::io::stdout(), settings)
            })
            .await??
        }
    };

    if !json {
        print_header(&job);
    }

    let mut handle = start_job(job, settings.progress_every);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupts = Interrupts::default();

    loop {
        tokio::select! {
            event = handle.next() => match event {
                Some(event) => {
                    if !json {
                        report(&event);
                    }
                }
                None => break,
            },
            _ = &mut ctrl_c => match interrupts.on_signal() {
                SignalAction::Cancel => {
                    handle.request_cancel();
                    eprintln!("Cancelling... the current line will be finished first (Ctrl-C again to quit now)");
                    ctrl_c.set(tokio::signal::ctrl_c());
                }
                // 阻塞线程可能卡在 I/O 上，运行时关闭时会一直等它，只能直接退出进程
                SignalAction::ForceQuit => {
                    log::warn!("second interrupt, exiting without waiting for the split to stop");
                    log::logger().flush();
                    eprintln!("Interrupted again, exiting now");
                    std::process::exit(i32::from(EXIT_CANCELLED));
                }
            },
        }
    }

    let outcome = handle.join().await?;
    if let Err(e) = logger::log_stats(settings, outcome.summary()) {
        log::warn!("could not record stats: {}", e);
    }
    if json {
        let text = serde_json::to_string_pretty(outcome.summary())
            .map_err(|e| AppError::Internal(format!("serialize summary: {}", e)))?;
        println!("{}", text);
    }

    match outcome {
        Outcome::Completed(summary) => {
            if !json {
                print_summary(&summary);
            }
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Cancelled(summary) => {
            eprintln!(
                "Cancelled after {} lines; {} part file(s) kept in {}",
                group_digits(summary.total_lines),
                summary.total_parts,
                summary.output_dir.display()
            );
            Ok(ExitCode::from(EXIT_CANCELLED))
        }
        Outcome::Failed { error, .. } => Err(error),
    }
}

fn print_header(job: &SplitJob) {
    println!("Splitting {}...", job.input_path.display());
    println!("Output directory: {}", job.output_dir().display());
    match job.policy {
        SplitPolicy::ByLineCount(n) => println!("Lines per file: {}", group_digits(n)),
        SplitPolicy::ByByteSize(bytes) => println!("Max size per file: {}", describe_size(bytes)),
    }
}

fn report(event: &Event) {
    match event {
        Event::Status(text) => println!("{}", text),
        Event::Progress(p) => println!(
            "  Processed {} lines... ({:.1}%)",
            group_digits(p.total_lines),
            p.percent_complete
        ),
        // 最终结果在任务结束后统一输出
        Event::Outcome(_) => {}
    }
}

fn print_summary(summary: &SplitSummary) {
    println!();
    println!("Splitting complete!");
    println!("Total lines processed: {}", group_digits(summary.total_lines));
    println!("Total files created: {}", summary.total_parts);
    println!("Output location: {}", summary.output_dir.display());
}

fn group_digits(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn describe_size(bytes: u64) -> String {
    if bytes % BYTES_PER_MB == 0 {
        format!("{} MB", bytes / BYTES_PER_MB)
    } else {
        format!("{} bytes", group_digits(bytes))
    }
}
