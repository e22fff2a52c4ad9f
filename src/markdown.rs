//! Markdown responses stored on session queries.
//!
//! A query's `response` is the markdown the client rendered when the query
//! ran. History is redisplayed by parsing that markdown back into a table, so
//! the writer and the parser here must agree on the layout.

use serde_json::Value;

use crate::api::models::QueryResult;

const SQL_HEADING: &str = "**Generated SQL:**";
const RESULTS_HEADING: &str = "**Results:**";
const EXPLANATION_HEADING: &str = "**Explanation:**";
const ERROR_HEADING: &str = "**Error:**";
const FENCE: &str = "```";
const QUERY_FAILED: &str = "Query failed:";
const NO_RESULTS: &str = "No results found.";
const NULL: &str = "NULL";
/// A string cell that happens to read `NULL`, kept apart from SQL null.
const LITERAL_NULL: &str = "\\NULL";

/// A previous result recovered from its markdown rendering.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedResults {
    pub success: bool,
    pub status: Option<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedResponse {
    pub sql: String,
    pub results: Option<ParsedResults>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultsSummary {
    pub preview: String,
    pub row_count: usize,
    pub has_error: bool,
}

/// Strips markdown code fences an LLM may wrap around generated SQL.
pub fn clean_sql(sql: &str) -> String {
    let without_tagged = sql.replace("```sql", "");
    let mut s = without_tagged.trim();
    if let Some(rest) = s.strip_prefix(FENCE) {
        s = rest.trim_start();
    }
    if let Some(rest) = s.strip_suffix(FENCE) {
        s = rest.trim_end();
    }
    s.trim().to_string()
}

/// Response stored right after generation, before the user runs the SQL.
pub fn generated_response(sql: &str, explanation: &str) -> String {
    let mut out = format!("\n{}\n{}sql\n{}\n{}\n", SQL_HEADING, FENCE, sql, FENCE);
    if !explanation.is_empty() {
        out.push_str(&format!("{}\n{}\n", EXPLANATION_HEADING, explanation));
    }
    out
}

/// Response stored once the SQL has been executed.
pub fn executed_response(sql: &str, result: &QueryResult) -> String {
    format!(
        "\n{}\n{}\n{}\n{}\n\n{}\n{}\n",
        SQL_HEADING,
        FENCE,
        sql,
        FENCE,
        RESULTS_HEADING,
        format_results(result)
    )
}

/// Response stored when execution could not reach a result at all.
pub fn failed_response(sql: &str, message: &str) -> String {
    format!(
        "\n{}\n{}\n{}\n{}\n\n{}\nError: {}\n",
        SQL_HEADING, FENCE, sql, FENCE, ERROR_HEADING, message
    )
}

/// Renders an execution result as a markdown table, or a one-line status.
pub fn format_results(result: &QueryResult) -> String {
    if !result.success {
        return format!("{} {}", QUERY_FAILED, result.status);
    }
    if result.rows.is_empty() {
        return NO_RESULTS.to_string();
    }

    let headers: Vec<String> = result.columns.iter().map(|c| escape_cell(c)).collect();
    let mut table = format!("| {} |\n", headers.join(" | "));
    table.push_str(&format!(
        "| {} |\n",
        headers.iter().map(|_| "---").collect::<Vec<_>>().join(" | ")
    ));

    for row in &result.rows {
        let cells: Vec<String> = row.iter().map(cell_text).collect();
        table.push_str(&format!("| {} |\n", cells.join(" | ")));
    }

    table
}

pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => NULL.to_string(),
        Value::String(s) if s == NULL => LITERAL_NULL.to_string(),
        Value::String(s) => escape_cell(s),
        other => escape_cell(&other.to_string()),
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('\n', " ").replace('|', "\\|")
}

/// First fenced block of the response, with an optional `sql` tag.
pub fn extract_sql(text: &str) -> String {
    let Some(start) = text.find(FENCE) else {
        return String::new();
    };
    let after = &text[start + FENCE.len()..];
    let after = after.strip_prefix("sql").unwrap_or(after);
    match after.find(FENCE) {
        Some(end) => after[..end].trim().to_string(),
        None => String::new(),
    }
}

/// Recovers the SQL and the result table from a stored response.
pub fn parse_results(text: &str) -> ParsedResponse {
    let sql = extract_sql(text);

    let Some(start) = text.find(RESULTS_HEADING) else {
        return ParsedResponse { sql, results: None };
    };

    let section = text[start + RESULTS_HEADING.len()..].trim_start_matches(['\n', '\r', ' ']);
    let section = match section.find("\n\n") {
        Some(end) => &section[..end],
        None => section,
    }
    .trim();

    if let Some(status) = section.strip_prefix(QUERY_FAILED) {
        let results = ParsedResults {
            success: false,
            status: Some(status.trim().to_string()),
            ..Default::default()
        };
        return ParsedResponse {
            sql,
            results: Some(results),
        };
    }

    if section.starts_with("No results") {
        let results = ParsedResults {
            success: true,
            status: Some(section.to_string()),
            ..Default::default()
        };
        return ParsedResponse {
            sql,
            results: Some(results),
        };
    }

    ParsedResponse {
        sql,
        results: parse_table(section),
    }
}

fn parse_table(section: &str) -> Option<ParsedResults> {
    let mut lines = section
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('|'));

    let columns: Vec<String> = split_row(lines.next()?)
        .into_iter()
        .map(|c| c.trim().to_string())
        .collect();

    let separator = lines.next()?;
    if !separator
        .chars()
        .all(|c| matches!(c, '|' | '-' | ':' | ' '))
    {
        return None;
    }

    let rows = lines
        .map(|line| {
            split_row(line)
                .into_iter()
                .map(|cell| match cell.trim() {
                    NULL => None,
                    LITERAL_NULL => Some(NULL.to_string()),
                    other => Some(other.to_string()),
                })
                .collect()
        })
        .collect();

    Some(ParsedResults {
        success: true,
        status: None,
        columns,
        rows,
    })
}

/// Splits `| a | b |` on unescaped pipes, unescaping `\|` inside cells.
fn split_row(line: &str) -> Vec<String> {
    let inner = line.trim();
    let inner = inner.strip_prefix('|').unwrap_or(inner);
    let inner = match inner.strip_suffix('|') {
        Some(rest) if !rest.ends_with('\\') => rest,
        _ => inner,
    };

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    cells.push(current);
    cells
}

/// Short preview of a stored response for the history list.
pub fn summarize(text: &str) -> ResultsSummary {
    const MAX_COLUMNS: usize = 4;
    const MAX_ROWS: usize = 2;
    const MAX_CELL: usize = 15;
    const MAX_SQL: usize = 70;

    if text.trim().is_empty() {
        return ResultsSummary {
            preview: "No results available".to_string(),
            row_count: 0,
            has_error: false,
        };
    }

    let parsed = parse_results(text);
    let results = match parsed.results {
        Some(results) if results.success => results,
        Some(results) => {
            return ResultsSummary {
                preview: results.status.unwrap_or_else(|| "Query failed".to_string()),
                row_count: 0,
                has_error: true,
            }
        }
        None => {
            let has_error = text.contains(ERROR_HEADING) || text.trim_start().starts_with("Error:");
            let preview = if has_error {
                text.lines()
                    .find_map(|l| l.strip_prefix("Error:"))
                    .map(|m| m.trim().to_string())
                    .unwrap_or_else(|| "Query failed".to_string())
            } else if parsed.sql.is_empty() {
                "No results available".to_string()
            } else {
                format!("SQL: {}", truncate(&parsed.sql, MAX_SQL))
            };
            return ResultsSummary {
                preview,
                row_count: 0,
                has_error,
            };
        }
    };

    if results.rows.is_empty() {
        return ResultsSummary {
            preview: "Query executed successfully. No records found.".to_string(),
            row_count: 0,
            has_error: false,
        };
    }

    let row_count = results.rows.len();
    let mut preview = String::new();
    if !parsed.sql.is_empty() {
        preview.push_str(&format!("SQL: {}\n\n", truncate(&parsed.sql, MAX_SQL)));
    }
    preview.push_str(&format!(
        "Results: {} {} returned\n\n",
        row_count,
        if row_count == 1 { "row" } else { "rows" }
    ));

    let shown = MAX_COLUMNS.min(results.columns.len());
    let mut headers: Vec<String> = results.columns[..shown].to_vec();
    if results.columns.len() > shown {
        headers.push("...".to_string());
    }
    preview.push_str(&format!("{}\n", headers.join(" | ")));

    for row in results.rows.iter().take(MAX_ROWS) {
        let mut values: Vec<String> = row
            .iter()
            .take(shown)
            .map(|v| match v {
                Some(v) => truncate(v, MAX_CELL),
                None => NULL.to_string(),
            })
            .collect();
        if results.columns.len() > shown {
            values.push("...".to_string());
        }
        preview.push_str(&format!("{}\n", values.join(" | ")));
    }

    if row_count > MAX_ROWS {
        preview.push_str(&format!("... and {} more rows", row_count - MAX_ROWS));
    }

    ResultsSummary {
        preview,
        row_count,
        has_error: false,
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}
