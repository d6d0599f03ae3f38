//! The parse module turns the raw markdown list into summary, category and
//! item records.
//!
//! Only the small subset of markdown used by the source document is handled:
//! a title line, metadata bullets, the category count bullets and `## `
//! sections holding a four column pipe table.

use std::collections::HashMap;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::{COUNT_LINE, COUNTS_HEADING, SOURCE_PREFIX, TOTAL_PREFIX, UPDATED_PREFIX};
use crate::model::{DrugCategory, DrugItem, DrugSummary};
use crate::text::{build_slug, normalize_text};

static TOTAL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(TOTAL_PREFIX).expect("Failed to compile TOTAL_PREFIX regex"));
static UPDATED_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(UPDATED_PREFIX).expect("Failed to compile UPDATED_PREFIX regex"));
static SOURCE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(SOURCE_PREFIX).expect("Failed to compile SOURCE_PREFIX regex"));
static COUNT_LINE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(COUNT_LINE).expect("Failed to compile COUNT_LINE regex"));

/// A `## ` section of the source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Normalized heading text.
    pub heading: String,
    /// Everything after the heading line.
    pub body: String,
}

/// Extracts the summary statistics from the metadata bullets.
///
/// A missing bullet leaves the corresponding field empty.
pub fn extract_summary<S: AsRef<str>>(lines: &[S]) -> DrugSummary {
    DrugSummary {
        total: summary_field(lines, "- 已收录", &TOTAL_REGEX),
        last_updated: summary_field(lines, "- 统计截止时间", &UPDATED_REGEX),
        source: summary_field(lines, "- 数据来源", &SOURCE_REGEX),
    }
}

fn summary_field<S: AsRef<str>>(lines: &[S], prefix: &str, prefix_regex: &Regex) -> String {
    let line = match lines
        .iter()
        .map(|line| normalize_text(line.as_ref()))
        .find(|line| line.starts_with(prefix))
    {
        Some(line) => line,
        None => return String::new(),
    };

    let value = prefix_regex.replace(&line, "");
    value.strip_suffix('。').unwrap_or(&value).to_string()
}

/// Reads the declared `category → item count` mapping.
///
/// Scanning starts after the count heading and stops at the first line that
/// is not a `- ` bullet. Bullets without a `name：number` shape are skipped.
pub fn extract_category_counts<S: AsRef<str>>(lines: &[S]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();

    let start = match lines
        .iter()
        .position(|line| normalize_text(line.as_ref()).starts_with(COUNTS_HEADING))
    {
        Some(start) => start,
        None => return counts,
    };

    for line in lines.iter().skip(start + 1) {
        let line = normalize_text(line.as_ref());
        if !line.starts_with("- ") {
            break;
        }

        if let Some(captures) = COUNT_LINE_REGEX.captures(&line)
            && let (Some(name), Some(count)) = (captures.get(1), captures.get(2))
            && let Ok(count) = count.as_str().parse::<usize>()
        {
            counts.insert(name.as_str().to_string(), count);
        }
    }

    counts
}

/// Parses the first pipe table of a section body into drug items.
///
/// A table needs a header, a separator and at least one data row; anything
/// shorter yields no items. Rows with fewer than four cells are padded with
/// empty strings and extra cells are ignored.
pub fn parse_table(body: &str) -> Vec<DrugItem> {
    let table_lines: Vec<&str> = body
        .lines()
        .map(str::trim)
        .skip_while(|line| !line.starts_with('|'))
        .take_while(|line| line.starts_with('|'))
        .collect();

    if table_lines.len() < 3 {
        return Vec::new();
    }

    table_lines
        .into_iter()
        .skip(2)
        .filter(|line| !line.is_empty() && *line != "|" && *line != "| |")
        .map(parse_row)
        .collect()
}

fn parse_row(line: &str) -> DrugItem {
    let inner = line.strip_prefix('|').unwrap_or(line);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    let mut cells = inner.split('|').map(normalize_text);
    let mut next_cell = || cells.next().unwrap_or_default();

    DrugItem {
        brand_name: next_cell(),
        generic_name: next_cell(),
        manufacturer_short: next_cell(),
        manufacturer_full: next_cell(),
        image: String::new(),
    }
}

/// Splits the document on level-2 headings. Text before the first heading is
/// not a section.
pub fn split_sections(markdown: &str) -> Vec<Section> {
    markdown
        .split("\n## ")
        .skip(1)
        .map(|raw| {
            let (heading, body) = raw.split_once('\n').unwrap_or((raw, ""));
            Section {
                heading: normalize_text(heading),
                body: body.to_string(),
            }
        })
        .collect()
}

/// Returns the document title taken from its first line.
pub fn parse_title<S: AsRef<str>>(lines: &[S]) -> String {
    let first = normalize_text(lines.first().map(AsRef::as_ref).unwrap_or_default());
    normalize_text(first.strip_prefix('#').unwrap_or(&first))
}

/// Builds the categories of the document. Declared counts are matched by exact
/// heading text; unmatched categories report their parsed item count.
pub fn build_categories(markdown: &str, counts: &HashMap<String, usize>) -> Vec<DrugCategory> {
    split_sections(markdown)
        .into_iter()
        .map(|section| {
            let items = parse_table(&section.body);
            let count = match counts.get(&section.heading) {
                Some(count) => *count,
                None => {
                    debug!(
                        "No declared count for {}, using {} parsed items",
                        section.heading,
                        items.len()
                    );
                    items.len()
                }
            };

            DrugCategory {
                slug: build_slug(&section.heading),
                name: section.heading,
                count,
                items,
            }
        })
        .collect()
}
