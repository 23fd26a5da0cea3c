//! CLI Module - One-shot commands and the interactive question prompt

use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::{Highlighter, MatchingBracketHighlighter};
use rustyline::hint::{Hinter, HistoryHinter};
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use rustyline::Editor;
use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use crate::aggregate::{ReportKind, ReportOutcome, NO_DATA_AVAILABLE};
use crate::config::Config;
use crate::engine::SalesEngine;
use crate::rule::DEFAULT_RULES;
use crate::schema;

const HISTORY_FILE: &str = ".salesdesk_history";

pub struct SalesHelper {
    words: Vec<String>,
    highlighter: MatchingBracketHighlighter,
    hinter: HistoryHinter,
    colored_prompt: String,
}

impl SalesHelper {
    /// Completion over rule phrases, table names and column names.
    pub fn new() -> Self {
        let mut words: Vec<String> = DEFAULT_RULES.iter()
            .flat_map(|r| r.patterns.iter().map(|p| p.to_string()))
            .collect();
        for table in schema::catalog() {
            words.push(table.name.to_string());
            words.extend(table.column_names().into_iter().map(str::to_string));
        }
        words.sort();
        words.dedup();

        Self {
            words,
            highlighter: MatchingBracketHighlighter::new(),
            hinter: HistoryHinter {},
            colored_prompt: "\x1b[1;32msalesdesk>\x1b[0m ".to_owned(),
        }
    }
}

impl Default for SalesHelper {
    fn default() -> Self {
        Self::new()
    }
}

impl Completer for SalesHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, word) = extract_word(line, pos);
        if word.is_empty() {
            return Ok((start, Vec::new()));
        }
        let word = word.to_lowercase();
        let candidates = self.words.iter()
            .filter(|w| w.starts_with(&word))
            .map(|w| Pair { display: w.clone(), replacement: w.clone() })
            .collect();
        Ok((start, candidates))
    }
}

impl Hinter for SalesHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, ctx: &Context<'_>) -> Option<String> {
        self.hinter.hint(line, pos, ctx)
    }
}

impl Highlighter for SalesHelper {
    fn highlight<'l>(&self, line: &'l str, pos: usize) -> Cow<'l, str> {
        self.highlighter.highlight(line, pos)
    }

    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        default: bool,
    ) -> Cow<'b, str> {
        if default {
            Cow::Borrowed(&self.colored_prompt)
        } else {
            Cow::Borrowed(prompt)
        }
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned("\x1b[1m".to_owned() + hint + "\x1b[m")
    }
}

// Questions are single lines; nothing to validate
impl Validator for SalesHelper {}

impl Helper for SalesHelper {}

fn extract_word(line: &str, pos: usize) -> (usize, &str) {
    let line = &line[..pos];
    let start = line.char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace() || "(),;?".contains(*c))
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    (start, &line[start..])
}

/// Answer one question and print the response as JSON.
pub async fn run_ask(engine: Arc<SalesEngine>, question: &str) -> Result<(), Box<dyn std::error::Error>> {
    match engine.ask(question).await {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(e) => {
            let body = serde_json::json!({ "error": e.to_string(), "stage": e.stage() });
            println!("{}", serde_json::to_string_pretty(&body)?);
            Err(e.into())
        }
    }
}

/// Render a report to a PNG file.
pub async fn run_report(
    engine: Arc<SalesEngine>,
    kind: ReportKind,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    match engine.report(kind).await? {
        ReportOutcome::Chart { labels, png, .. } => {
            tokio::fs::write(output, &png).await?;
            println!("Wrote {} chart ({} items) to {}", kind, labels.len(), output.display());
        }
        ReportOutcome::NoData => println!("{}", NO_DATA_AVAILABLE),
    }
    Ok(())
}

pub async fn run_init(output: String) -> Result<(), Box<dyn std::error::Error>> {
    println!("Initializing configuration file at {}...", output);
    let content = format!("# salesdesk configuration\n{}", Config::default().to_toml()?);
    tokio::fs::write(&output, content).await?;
    println!("Configuration file created successfully.");
    Ok(())
}

fn print_help() {
    println!("Ask a question about your sales data, for example:");
    println!("  What are my total sales?");
    println!("  What is my RoAS?");
    println!("  Which product had the highest CPC?");
    println!();
    println!("Commands:");
    println!("  \\sql                   Toggle printing the SQL behind each answer");
    println!("  \\rows                  Toggle printing the raw result rows");
    println!("  \\chart <kind> <file>   Write the sales or ad_spend chart to a PNG file");
    println!("  \\tables                List tables and columns");
    println!("  help, \\?               Show this help");
    println!("  exit, quit             Exit");
}

/// Interactive loop answering questions locally.
pub async fn run_repl(engine: Arc<SalesEngine>) -> Result<(), Box<dyn std::error::Error>> {
    let mut rl = Editor::new()?;
    rl.set_helper(Some(SalesHelper::new()));
    rl.load_history(HISTORY_FILE).ok();

    let mut show_sql = true;
    let mut show_rows = false;

    println!("salesdesk v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'help' for help, 'exit' to quit.");

    loop {
        let line = match rl.readline("salesdesk> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                println!("Error: {}", e);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        rl.add_history_entry(line)?;

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }
        if line.eq_ignore_ascii_case("help") || line == "\\?" {
            print_help();
            continue;
        }

        if let Some(command) = line.strip_prefix('\\') {
            let parts: Vec<&str> = command.split_whitespace().collect();
            match parts.as_slice() {
                ["sql"] => {
                    show_sql = !show_sql;
                    println!("SQL display is {}.", if show_sql { "on" } else { "off" });
                }
                ["rows"] => {
                    show_rows = !show_rows;
                    println!("Row display is {}.", if show_rows { "on" } else { "off" });
                }
                ["tables"] => {
                    for table in schema::catalog() {
                        println!("{}", table.describe());
                    }
                }
                ["chart", kind, file] => match kind.parse::<ReportKind>() {
                    Ok(kind) => {
                        if let Err(e) = run_report(engine.clone(), kind, Path::new(file)).await {
                            println!("Error: {}", e);
                        }
                    }
                    Err(e) => println!("Error: {}", e),
                },
                _ => println!("Unknown command: \\{}. Type 'help' for help.", command),
            }
            continue;
        }

        match engine.ask(line).await {
            Ok(response) => {
                if show_sql {
                    println!("-- {:?}", response.sql_origin);
                    println!("{}", response.sql_query);
                }
                if show_rows {
                    println!("{}", serde_json::to_string(&response.result)?);
                }
                println!("{}", response.answer);
            }
            Err(e) => println!("Error ({}): {}", e.stage(), e),
        }
    }

    rl.save_history(HISTORY_FILE).ok();
    Ok(())
}
