//! Interactive sample picking and labeling.
//!
//! Both loops show one record at a time, ask the operator for a decision and
//! append the result to the output file straight away, so an interrupted
//! session keeps everything decided so far.

use std::path::Path;
use std::slice;

use colored::Colorize;
use dialoguer::{Confirm, Input};
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use serde_json::Value;

use crate::error::{DmError, Result};
use crate::record::Record;
use crate::store::write_jsonl;

/// Source of operator decisions.
pub trait Prompter {
    /// Present a rendered record.
    fn show(&mut self, text: &str) -> Result<()>;

    /// Ask whether the record just shown should be kept.
    fn confirm_keep(&mut self) -> Result<bool>;

    /// Ask for a free-text label for the record just shown.
    fn ask_label(&mut self) -> Result<String>;
}

/// Prompts on the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn show(&mut self, text: &str) -> Result<()> {
        // clear screen, cursor home
        print!("\x1B[2J\x1B[1;1H");
        println!("{text}");
        Ok(())
    }

    fn confirm_keep(&mut self) -> Result<bool> {
        Confirm::new()
            .with_prompt("Keep this sample?")
            .default(true)
            .interact()
            .map_err(|e| DmError::Prompt(e.to_string()))
    }

    fn ask_label(&mut self) -> Result<String> {
        Input::<String>::new()
            .with_prompt("Label")
            .allow_empty(true)
            .interact_text()
            .map_err(|e| DmError::Prompt(e.to_string()))
    }
}

/// Shared settings of the pick and label loops.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Number of leading records to skip.
    pub start_from: usize,
    /// Show string values as text rather than as JSON literals.
    pub render: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            start_from: 0,
            render: true,
        }
    }
}

/// Outcome of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub shown: usize,
    pub written: usize,
}

/// Render a record for display: each field name upper-cased and bold on its
/// own line, followed by the value.
///
/// With `render` set, string values are treated as Markdown and styled for
/// the terminal. Otherwise every value is shown as its JSON literal.
pub fn render_record(record: &Record, render: bool) -> String {
    let mut out = String::new();
    for (key, value) in record.iter() {
        out.push_str(&key.to_uppercase().bold().to_string());
        out.push('\n');
        match value {
            Value::String(s) if render => out.push_str(&render_markdown(s)),
            other => out.push_str(&other.to_string()),
        }
        out.push_str("\n\n");
    }
    out
}

/// Style Markdown text with ANSI attributes.
///
/// Headings are bold and underlined, strong text bold, emphasis italic,
/// inline code yellow and code blocks cyan. List items get a bullet or
/// their number.
pub fn render_markdown(text: &str) -> String {
    let mut out = String::new();
    let mut strong = 0usize;
    let mut emphasis = 0usize;
    let mut heading = false;
    let mut link = false;
    let mut code_block = false;
    let mut lists: Vec<Option<u64>> = Vec::new();

    for event in Parser::new(text) {
        match event {
            Event::Start(Tag::Heading { .. }) => heading = true,
            Event::End(TagEnd::Heading(_)) => {
                heading = false;
                out.push_str("\n\n");
            }
            Event::Start(Tag::Strong) => strong += 1,
            Event::End(TagEnd::Strong) => strong = strong.saturating_sub(1),
            Event::Start(Tag::Emphasis) => emphasis += 1,
            Event::End(TagEnd::Emphasis) => emphasis = emphasis.saturating_sub(1),
            Event::Start(Tag::Link { .. }) => link = true,
            Event::End(TagEnd::Link) => link = false,
            Event::Start(Tag::CodeBlock(_)) => code_block = true,
            Event::End(TagEnd::CodeBlock) => {
                code_block = false;
                out.push('\n');
            }
            Event::Start(Tag::List(start)) => {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                lists.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                lists.pop();
                if lists.is_empty() {
                    out.push('\n');
                }
            }
            Event::Start(Tag::Item) => {
                out.push_str(&"  ".repeat(lists.len().saturating_sub(1)));
                match lists.last_mut() {
                    Some(Some(n)) => {
                        out.push_str(&format!("{n}. "));
                        *n += 1;
                    }
                    _ => out.push_str("• "),
                }
            }
            Event::End(TagEnd::Item) => {
                if !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            Event::End(TagEnd::Paragraph) => {
                out.push_str(if lists.is_empty() { "\n\n" } else { "\n" });
            }
            Event::Text(t) => {
                let text: &str = &t;
                let mut styled = text.normal();
                if heading {
                    styled = styled.bold().underline();
                }
                if strong > 0 {
                    styled = styled.bold();
                }
                if emphasis > 0 {
                    styled = styled.italic();
                }
                if link {
                    styled = styled.blue().underline();
                }
                if code_block {
                    styled = styled.cyan();
                }
                out.push_str(&styled.to_string());
            }
            Event::Code(t) => {
                let code: &str = &t;
                out.push_str(&code.yellow().to_string());
            }
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::Rule => out.push_str("────────\n\n"),
            Event::Html(t) | Event::InlineHtml(t) => out.push_str(&t),
            _ => {}
        }
    }

    out.trim_end().to_string()
}

/// Let the operator choose which records to keep.
///
/// The output file is truncated first; each kept record is appended as soon
/// as it is accepted.
pub fn pick(
    records: &[Record],
    output: &Path,
    options: &SessionOptions,
    prompter: &mut dyn Prompter,
) -> Result<SessionSummary> {
    write_jsonl(output, &[], false)?;
    let mut summary = SessionSummary {
        shown: 0,
        written: 0,
    };

    for record in records.iter().skip(options.start_from) {
        prompter.show(&render_record(record, options.render))?;
        summary.shown += 1;
        if prompter.confirm_keep()? {
            write_jsonl(output, slice::from_ref(record), true)?;
            summary.written += 1;
        }
    }

    log::info!(
        "kept {} of {} samples in {}",
        summary.written,
        summary.shown,
        output.display()
    );
    Ok(summary)
}

/// Ask the operator for a label for every record and store it under
/// `label_key`.
///
/// The output file is truncated first; each labeled record is appended as
/// soon as its label is entered.
pub fn label(
    records: Vec<Record>,
    output: &Path,
    label_key: &str,
    options: &SessionOptions,
    prompter: &mut dyn Prompter,
) -> Result<SessionSummary> {
    write_jsonl(output, &[], false)?;
    let mut summary = SessionSummary {
        shown: 0,
        written: 0,
    };

    for mut record in records.into_iter().skip(options.start_from) {
        prompter.show(&render_record(&record, options.render))?;
        summary.shown += 1;
        let answer = prompter.ask_label()?;
        record.set(label_key, Value::String(answer));
        write_jsonl(output, slice::from_ref(&record), true)?;
        summary.written += 1;
    }

    log::info!("labeled {} samples in {}", summary.written, output.display());
    Ok(summary)
}
