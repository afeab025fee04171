//! Line tokenizer
//!
//! This module turns one configuration line into whitespace separated tokens plus the
//! trailing comment, if any.
//!
//! Structure:
//!     Raw tokenization is done by the logos lexer (`tokens_core`, `base_tokenization`).
//!     A small state machine then glues raw tokens into words, tracking whether a quote
//!     is open and stopping at the first unquoted, unescaped `#`.
//!
//! Rules:
//!     - Runs of spaces and tabs separate tokens, unless the space is backslash escaped.
//!     - `#` starts the comment unless escaped or inside an open quote.
//!     - Single and double quotes open a verbatim region; the quote characters stay in
//!       the token. An escaped quote neither opens nor closes one. An unterminated
//!       quote runs to the end of the line.
//!     - A comment-only line carrying one of the reserved markers (`_version`,
//!       `_md5hash`, `##_config-snippet_###`) becomes a one-token line so a dedicated
//!       directive can claim it.
//!
//! Tokenization never fails.

pub mod base_tokenization;
pub mod tokens_core;

pub use base_tokenization::tokenize;
pub use tokens_core::Token;

/// Synthetic token for `# _version=<n>` lines.
pub const VERSION_MARKER: &str = "# _version";
/// Synthetic token for `# _md5hash=<hex>` lines.
pub const HASH_MARKER: &str = "# _md5hash";
/// Synthetic token for `###_config-snippet_### BEGIN|END` lines.
pub const SNIPPET_MARKER: &str = "###_config-snippet_###";

const SNIPPET_COMMENT_PREFIX: &str = "##_config-snippet_###";

/// One tokenized line
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Line {
    pub tokens: Vec<String>,
    /// Trailing comment without its `#`, trimmed. `Some("")` for a bare `#`.
    pub comment: Option<String>,
}

impl Line {
    /// True for empty and whitespace-only lines
    pub fn is_blank(&self) -> bool {
        self.tokens.is_empty() && self.comment.is_none()
    }

    /// True for lines holding nothing but a comment
    pub fn is_comment_only(&self) -> bool {
        self.tokens.is_empty() && self.comment.is_some()
    }

    /// The comment text, `""` when there is none
    pub fn comment(&self) -> &str {
        self.comment.as_deref().unwrap_or("")
    }

    fn promote_marker(mut self) -> Self {
        if !self.tokens.is_empty() {
            return self;
        }
        let Some(comment) = self.comment.as_deref() else {
            return self;
        };
        if comment.starts_with("_version") {
            self.tokens.push(VERSION_MARKER.to_string());
        } else if comment.starts_with("_md5hash") {
            self.tokens.push(HASH_MARKER.to_string());
        } else if let Some(rest) = comment.strip_prefix(SNIPPET_COMMENT_PREFIX) {
            let rest = rest.trim().to_string();
            self.tokens.push(SNIPPET_MARKER.to_string());
            self.comment = Some(rest);
        }
        self
    }
}

/// True when the raw line starts with indentation
pub fn is_indented(raw: &str) -> bool {
    raw.starts_with([' ', '\t'])
}

/// Split one line (without its newline) into tokens and trailing comment.
pub fn tokenize_line(source: &str) -> Line {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut open_quote: Option<Token> = None;
    let mut comment = None;

    for (token, span) in tokenize(source) {
        let slice = &source[span.clone()];

        if let Some(quote) = open_quote {
            current.push_str(slice);
            if token == quote {
                open_quote = None;
            }
            continue;
        }

        match token {
            Token::Blank => flush(&mut tokens, &mut current),
            Token::Hash => {
                comment = Some(source[span.end..].trim().to_string());
                break;
            }
            quote if quote.is_quote() => {
                current.push_str(slice);
                open_quote = Some(quote);
            }
            part if part.is_word_part() => current.push_str(slice),
            _ => {}
        }
    }
    flush(&mut tokens, &mut current);

    Line { tokens, comment }.promote_marker()
}

/// True when `text` reads back as exactly that one token
pub fn is_single_token(text: &str) -> bool {
    if text.contains(['\n', '\r']) {
        return false;
    }
    let line = tokenize_line(text);
    line.comment.is_none() && line.tokens.len() == 1 && line.tokens[0] == text
}

fn flush(tokens: &mut Vec<String>, current: &mut String) {
    if !current.is_empty() {
        tokens.push(std::mem::take(current));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn words(source: &str) -> Vec<String> {
        tokenize_line(source).tokens
    }

    #[test]
    fn test_directive_with_comment() {
        let line = tokenize_line("  http-request deny deny_status 400 # deny");
        assert_eq!(
            line.tokens,
            vec!["http-request", "deny", "deny_status", "400"]
        );
        assert_eq!(line.comment(), "deny");
    }

    #[test]
    fn test_quotes_and_escapes_keep_words_together() {
        let line = tokenize_line(r"acl 'a b' c\ d");
        assert_eq!(line.tokens, vec!["acl", "'a b'", r"c\ d"]);
        assert_eq!(line.comment(), "");
        assert_eq!(line.comment, None);
    }

    #[rstest]
    #[case("", true)]
    #[case("   \t ", true)]
    #[case("#", false)]
    #[case("  # note", false)]
    #[case("daemon", false)]
    fn test_blank_detection(#[case] source: &str, #[case] blank: bool) {
        assert_eq!(tokenize_line(source).is_blank(), blank);
    }

    #[test]
    fn test_bare_hash_is_empty_comment() {
        let line = tokenize_line("   #   ");
        assert!(line.tokens.is_empty());
        assert_eq!(line.comment, Some(String::new()));
        assert!(line.is_comment_only());
    }

    #[rstest]
    #[case(r#"http-response set-header X "a # b""#, vec!["http-response", "set-header", "X", r#""a # b""#])]
    #[case(r#"log "it's" local0"#, vec!["log", r#""it's""#, "local0"])]
    #[case(r"acl x path_beg /a\#b", vec!["acl", "x", "path_beg", r"/a\#b"])]
    #[case(r#"acl x 'open ended # not a comment"#, vec!["acl", "x", "'open ended # not a comment"])]
    #[case(r#"a \"b c\""#, vec!["a", r#"\"b"#, r#"c\""#])]
    #[case("mode\thttp", vec!["mode", "http"])]
    #[case(r"trailing\", vec![r"trailing\"])]
    fn test_token_splitting(#[case] source: &str, #[case] expected: Vec<&str>) {
        assert_eq!(words(source), expected);
    }

    #[test]
    fn test_quote_inside_word() {
        assert_eq!(words(r#"set-var(txn.x) str("a b")"#), vec!["set-var(txn.x)", r#"str("a b")"#]);
    }

    #[test]
    fn test_version_marker() {
        let line = tokenize_line("# _version=42");
        assert_eq!(line.tokens, vec![VERSION_MARKER]);
        assert_eq!(line.comment(), "_version=42");
    }

    #[test]
    fn test_hash_marker() {
        let line = tokenize_line("# _md5hash=0123");
        assert_eq!(line.tokens, vec![HASH_MARKER]);
        assert_eq!(line.comment(), "_md5hash=0123");
    }

    #[test]
    fn test_snippet_markers() {
        let begin = tokenize_line("  ###_config-snippet_### BEGIN");
        assert_eq!(begin.tokens, vec![SNIPPET_MARKER]);
        assert_eq!(begin.comment(), "BEGIN");

        let end = tokenize_line("###_config-snippet_### END");
        assert_eq!(end.tokens, vec![SNIPPET_MARKER]);
        assert_eq!(end.comment(), "END");
    }

    #[test]
    fn test_markers_need_comment_only_lines() {
        let line = tokenize_line("daemon # _version=1");
        assert_eq!(line.tokens, vec!["daemon"]);
        assert_eq!(line.comment(), "_version=1");
    }

    #[rstest]
    #[case("app", true)]
    #[case("'my app'", true)]
    #[case(r"my\ app", true)]
    #[case("my app", false)]
    #[case("a#b", false)]
    #[case("a\nb", false)]
    #[case(" app", false)]
    #[case("", false)]
    fn test_is_single_token(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(is_single_token(text), expected);
    }

    #[test]
    fn test_is_indented() {
        assert!(is_indented("  mode http"));
        assert!(is_indented("\tmode http"));
        assert!(!is_indented("# comment"));
    }
}
