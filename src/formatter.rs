use crate::syntax::{tokenize, Token, TokenType};

/// Pretty-prints generated SQL: one top-level clause per line, joins and
/// boolean connectives indented beneath, keywords in upper case.
pub struct SqlFormatter {
    indent_size: usize,
}

const CLAUSES: &[&str] = &[
    "SELECT", "FROM", "WHERE", "GROUP", "HAVING", "ORDER", "LIMIT", "OFFSET", "UNION",
    "INTERSECT", "EXCEPT", "WITH", "RETURNING", "WINDOW",
];

const JOIN_STARTS: &[&str] = &["JOIN", "INNER", "LEFT", "RIGHT", "FULL", "CROSS"];

impl SqlFormatter {
    pub fn new() -> Self {
        Self { indent_size: 4 }
    }

    pub fn format(&self, sql: &str) -> String {
        let tokens: Vec<Token> = tokenize(sql)
            .into_iter()
            .filter(|t| t.token_type != TokenType::Whitespace)
            .collect();

        let mut out = String::new();
        let mut depth = 0usize;
        let mut prev: Option<&Token> = None;

        for token in &tokens {
            let upper = token.text.to_uppercase();
            let keyword = token.token_type == TokenType::Keyword;

            let clause = keyword && depth == 0 && CLAUSES.contains(&upper.as_str());
            // LEFT JOIN starts the line at LEFT, not at JOIN
            let join = keyword
                && depth == 0
                && JOIN_STARTS.contains(&upper.as_str())
                && !prev.is_some_and(|p| {
                    p.token_type == TokenType::Keyword
                        && JOIN_STARTS.contains(&p.text.to_uppercase().as_str())
                });
            let connective = keyword && depth == 0 && matches!(upper.as_str(), "AND" | "OR")
                && !prev.is_some_and(|p| p.is_keyword("BETWEEN") || p.token_type == TokenType::Number);

            // A line comment runs to the end of its line
            let after_line_comment = prev.is_some_and(|p| {
                p.token_type == TokenType::Comment && p.text.starts_with("--")
            });

            if clause {
                self.newline(&mut out, 0);
            } else if join || connective || after_line_comment {
                self.newline(&mut out, 1);
            } else if needs_space(prev, token) {
                out.push(' ');
            }

            if keyword {
                out.push_str(&upper);
            } else {
                out.push_str(&token.text);
            }

            match token.text.as_str() {
                "(" => depth += 1,
                ")" => depth = depth.saturating_sub(1),
                _ => {}
            }
            prev = Some(token);
        }

        out.trim().to_string()
    }

    fn newline(&self, out: &mut String, level: usize) {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&" ".repeat(self.indent_size * level));
    }
}

fn needs_space(prev: Option<&Token>, token: &Token) -> bool {
    let Some(prev) = prev else {
        return false;
    };
    if matches!(token.text.as_str(), ")" | "," | ";" | "." | "::")
        || matches!(prev.text.as_str(), "(" | "." | "::")
    {
        return false;
    }
    // function call: count(
    if token.text == "(" {
        return !matches!(prev.token_type, TokenType::Identifier)
            && !(prev.token_type == TokenType::Keyword && !is_clause_word(&prev.text));
    }
    true
}

fn is_clause_word(word: &str) -> bool {
    let upper = word.to_uppercase();
    CLAUSES.contains(&upper.as_str())
        || matches!(upper.as_str(), "IN" | "AS" | "ON" | "AND" | "OR" | "NOT" | "EXISTS" | "USING" | "OVER" | "FILTER" | "BY")
}

impl Default for SqlFormatter {
    fn default() -> Self {
        Self::new()
    }
}
