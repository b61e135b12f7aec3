// Terminal rendering of batch events and the final bucketed report
use crate::aggregator::{ResultBuckets, TermResult};
use crate::classifier::{ClassificationResult, MatchCategory};
use crate::coordinator::BatchEvent;
use colored::{ColoredString, Colorize};
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, IsTerminal};
use std::time::Duration;

/// Output mode for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Colors and a progress bar
    Human,
    /// One JSON object per line
    Json,
    /// Plain text without colors (for pipes/logs)
    Plain,
}

impl OutputMode {
    /// Auto-detect output mode based on environment
    pub fn auto() -> Self {
        if std::env::var("TMCHECK_JSON").is_ok() {
            Self::Json
        } else if !io::stdout().is_terminal() {
            Self::Plain
        } else {
            Self::Human
        }
    }
}

/// CLI output writer with mode awareness
pub struct OutputWriter {
    mode: OutputMode,
    progress: Option<ProgressBar>,
}

impl OutputWriter {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            progress: None,
        }
    }

    pub fn start_batch(&mut self, total: usize) {
        match self.mode {
            OutputMode::Human => {
                let pb = ProgressBar::new(100);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("[{elapsed}] {bar:40.green/blue} {pos}% {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("█▓▒░"),
                );
                pb.set_message(format!("{} terms", total));
                self.progress = Some(pb);
            }
            OutputMode::Plain => println!("Searching {} terms...", total),
            OutputMode::Json => {}
        }
    }

    pub fn on_event(&mut self, event: &BatchEvent) {
        match event {
            BatchEvent::Result { term, result } => self.result_line(term, result),
            BatchEvent::Progress(percent) => match self.mode {
                OutputMode::Human => {
                    if let Some(pb) = &self.progress {
                        pb.set_position(u64::from(*percent));
                    }
                }
                OutputMode::Json => {
                    println!("{}", serde_json::json!({"event": "progress", "percent": percent}))
                }
                OutputMode::Plain => {}
            },
            BatchEvent::Finished { elapsed } => self.finished(*elapsed),
        }
    }

    fn result_line(&self, term: &str, result: &ClassificationResult) {
        let line = match self.mode {
            OutputMode::Human => format!(
                "{} {}",
                format!("{}:", capitalize_term(term)).bold(),
                colorize(result.category, &result.summary())
            ),
            OutputMode::Plain => format!("{}: {}", capitalize_term(term), result.summary()),
            OutputMode::Json => {
                serde_json::json!({"event": "result", "term": term, "result": result}).to_string()
            }
        };

        match &self.progress {
            Some(pb) => pb.println(line),
            None => println!("{}", line),
        }
    }

    fn finished(&mut self, elapsed: Duration) {
        if let Some(pb) = self.progress.take() {
            pb.finish_and_clear();
        }
        let seconds = elapsed.as_secs_f64();
        match self.mode {
            OutputMode::Human => println!(
                "\n  {} Search time: {}",
                "✓".green(),
                format!("{:.2} seconds", seconds).cyan()
            ),
            OutputMode::Plain => println!("Search time: {:.2} seconds", seconds),
            OutputMode::Json => println!(
                "{}",
                serde_json::json!({"event": "finished", "elapsed_secs": seconds})
            ),
        }
    }

    /// Print the bucketed summary
    pub fn report(&self, buckets: &ResultBuckets) {
        if self.mode == OutputMode::Json {
            let sections: serde_json::Map<String, serde_json::Value> = buckets
                .sections()
                .iter()
                .map(|(title, items)| (title.to_string(), json_items(items)))
                .collect();
            println!(
                "{}",
                serde_json::json!({
                    "event": "summary",
                    "buckets": sections,
                    "unresolved": buckets.unresolved,
                })
            );
            return;
        }

        for (title, items) in buckets.sections() {
            if items.is_empty() {
                continue;
            }
            self.section(title);
            for (i, (term, result)) in items.iter().enumerate() {
                println!("  {}. {}: {}", i + 1, capitalize_term(term), report_detail(result));
            }
        }

        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(vec!["Bucket", "Terms"]);
        for (title, items) in buckets.sections() {
            table.add_row(vec![title.to_string(), items.len().to_string()]);
        }
        table.add_row(vec!["Total classified".to_string(), buckets.resolved().to_string()]);
        if buckets.unresolved > 0 {
            table.add_row(vec!["Cancelled / failed".to_string(), buckets.unresolved.to_string()]);
        }
        println!("\n{table}");
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        match self.mode {
            OutputMode::Human => {
                println!();
                println!("{}", title.cyan().bold());
                println!("{}", "═".repeat(title.len()).cyan());
            }
            OutputMode::Plain => {
                println!();
                println!("{}", title);
                println!("{}", "=".repeat(title.len()));
            }
            OutputMode::Json => {}
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if let Some(pb) = &self.progress {
            pb.finish_and_clear();
        }
        match self.mode {
            OutputMode::Human => eprintln!("  {} {}", "✗".red(), message),
            OutputMode::Plain => eprintln!("  [ERROR] {}", message),
            OutputMode::Json => {
                println!("{}", serde_json::json!({"event": "error", "message": message}))
            }
        }
    }
}

fn json_items(items: &[TermResult]) -> serde_json::Value {
    serde_json::Value::Array(
        items
            .iter()
            .map(|(term, result)| serde_json::json!({"term": term, "result": &**result}))
            .collect(),
    )
}

fn colorize(category: MatchCategory, text: &str) -> ColoredString {
    match category {
        MatchCategory::FullMatch => text.green(),
        MatchCategory::PartialMatch => text.yellow(),
        MatchCategory::TemplateMatch | MatchCategory::EmbeddedDescription => text.blue(),
        MatchCategory::DeletedDescription => text.red().strikethrough(),
        MatchCategory::Cancelled => text.dimmed(),
        MatchCategory::Error => text.red().bold(),
        MatchCategory::NoMatch => text.normal(),
    }
}

/// Per-bucket wording used in the final report
fn report_detail(result: &ClassificationResult) -> String {
    let id = result.record_id_or_default();
    match result.category {
        MatchCategory::PartialMatch => format!(
            "Partial match found for prefix: '{}' (Term ID: {}). Consider checking broader term for relevance.",
            result.matched_prefix.as_deref().unwrap_or_default(),
            id
        ),
        MatchCategory::DeletedDescription => format!(
            "{} (Term ID: {})",
            result.matched_description.as_deref().unwrap_or(&result.term),
            id
        ),
        _ => result.summary(),
    }
}

/// First letter upper-case, the rest lower-case
pub fn capitalize_term(term: &str) -> String {
    let trimmed = term.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
