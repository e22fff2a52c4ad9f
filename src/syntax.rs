use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Keyword,
    String,
    QuotedIdentifier,
    Number,
    Identifier,
    Operator,
    Comment,
    Whitespace,
    Punctuation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub text: String,
}

impl Token {
    fn new(token_type: TokenType, text: String) -> Self {
        Self { token_type, text }
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.token_type == TokenType::Keyword && self.text.eq_ignore_ascii_case(keyword)
    }

    pub fn style(&self) -> Style {
        match self.token_type {
            TokenType::Keyword => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            TokenType::String => Style::default().fg(Color::Green),
            TokenType::QuotedIdentifier => Style::default().fg(Color::LightBlue),
            TokenType::Number => Style::default().fg(Color::Yellow),
            TokenType::Comment => Style::default().fg(Color::DarkGray),
            TokenType::Operator => Style::default().fg(Color::Magenta),
            TokenType::Identifier | TokenType::Punctuation => Style::default().fg(Color::White),
            TokenType::Whitespace => Style::default(),
        }
    }
}

const KEYWORDS: &[&str] = &[
    // DML
    "SELECT", "FROM", "WHERE", "INSERT", "INTO", "VALUES", "UPDATE", "SET", "DELETE",
    "JOIN", "INNER", "LEFT", "RIGHT", "FULL", "OUTER", "CROSS", "LATERAL", "ON", "USING",
    "AND", "OR", "NOT", "IN", "BETWEEN", "LIKE", "ILIKE", "IS", "NULL", "AS", "WITH",
    "ORDER", "BY", "GROUP", "HAVING", "LIMIT", "OFFSET", "FETCH", "DISTINCT",
    "ASC", "DESC", "NULLS", "FIRST", "LAST", "UNION", "INTERSECT", "EXCEPT", "ALL", "ANY",
    "RETURNING", "TRUE", "FALSE",
    // Window functions
    "OVER", "PARTITION", "WINDOW", "ROWS", "RANGE", "FILTER",
    // Types used in casts
    "INTEGER", "INT", "BIGINT", "NUMERIC", "DECIMAL", "REAL", "FLOAT", "VARCHAR", "TEXT",
    "BOOLEAN", "DATE", "TIME", "TIMESTAMP", "TIMESTAMPTZ", "INTERVAL", "JSON", "JSONB",
    // Functions
    "COUNT", "SUM", "AVG", "MIN", "MAX", "COALESCE", "NULLIF", "CAST", "EXTRACT",
    "DATE_TRUNC", "ROUND", "LOWER", "UPPER", "NOW", "CURRENT_DATE", "CURRENT_TIMESTAMP",
    "ROW_NUMBER", "RANK", "DENSE_RANK",
    // Control flow
    "CASE", "WHEN", "THEN", "ELSE", "END", "EXISTS",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

/// Splits SQL into tokens. Concatenating the token texts yields the input.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        let mut text = String::from(ch);
        let token_type = match ch {
            c if c.is_whitespace() => {
                while let Some(&next) = chars.peek() {
                    if !next.is_whitespace() {
                        break;
                    }
                    text.push(next);
                    chars.next();
                }
                TokenType::Whitespace
            }

            // 'it''s' stays one token
            '\'' | '"' => {
                let quote = ch;
                while let Some(next) = chars.next() {
                    text.push(next);
                    if next == quote {
                        if chars.peek() == Some(&quote) {
                            text.push(quote);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
                if quote == '\'' {
                    TokenType::String
                } else {
                    TokenType::QuotedIdentifier
                }
            }

            '-' if chars.peek() == Some(&'-') => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    text.push(next);
                    chars.next();
                }
                TokenType::Comment
            }

            '/' if chars.peek() == Some(&'*') => {
                let mut prev = ' ';
                for next in chars.by_ref() {
                    text.push(next);
                    if prev == '*' && next == '/' && text.len() > 3 {
                        break;
                    }
                    prev = next;
                }
                TokenType::Comment
            }

            '0'..='9' => {
                let mut has_dot = false;
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_digit() || (next == '.' && !has_dot) {
                        has_dot |= next == '.';
                        text.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                TokenType::Number
            }

            '=' | '>' | '<' | '!' | '+' | '-' | '*' | '/' | '%' | '|' | '&' | ':' | '~' => {
                while let Some(&next) = chars.peek() {
                    let pair = matches!(
                        (text.as_str(), next),
                        (">" | "<" | "!", '=') | ("<", '>') | ("|", '|') | (":", ':') | ("-", '>') | ("->", '>')
                    );
                    if !pair {
                        break;
                    }
                    text.push(next);
                    chars.next();
                }
                TokenType::Operator
            }

            c if c.is_alphabetic() || c == '_' => {
                while let Some(&next) = chars.peek() {
                    if !(next.is_alphanumeric() || next == '_' || next == '$') {
                        break;
                    }
                    text.push(next);
                    chars.next();
                }
                if is_keyword(&text) {
                    TokenType::Keyword
                } else {
                    TokenType::Identifier
                }
            }

            _ => TokenType::Punctuation,
        };
        tokens.push(Token::new(token_type, text));
    }

    tokens
}

/// Styled lines for display. Tokens spanning a newline are split so every
/// line keeps its colors.
pub fn highlight(sql: &str) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();

    for token in tokenize(sql) {
        let style = token.style();
        let mut parts = token.text.split('\n').peekable();
        while let Some(part) = parts.next() {
            if !part.is_empty() {
                current.push(Span::styled(part.to_string(), style));
            }
            if parts.peek().is_some() {
                lines.push(Line::from(std::mem::take(&mut current)));
            }
        }
    }
    lines.push(Line::from(current));
    lines
}
