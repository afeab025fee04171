//! Raw token definitions for one configuration line
//!
//! These are the pieces logos cuts a line into before the line tokenizer glues them
//! back into whitespace separated words. They never span a newline: the caller hands
//! in one line at a time.
use logos::Logos;

/// All raw tokens a configuration line is made of
#[derive(Logos, Debug, PartialEq, Eq, Clone, Copy)]
pub enum Token {
    // A backslash and the character it protects
    #[regex(r"\\.")]
    Escaped,

    // Trailing backslash with nothing left to escape
    #[token("\\")]
    Backslash,

    #[regex(r"[ \t]+")]
    Blank,

    #[token("#")]
    Hash,

    #[token("'")]
    SingleQuote,

    #[token("\"")]
    DoubleQuote,

    // Anything else, up to the next character with a meaning of its own
    #[regex(r#"[^ \t#'"\\]+"#)]
    Word,
}

impl Token {
    /// Check if this token opens (or closes) a quoted region
    pub fn is_quote(&self) -> bool {
        matches!(self, Token::SingleQuote | Token::DoubleQuote)
    }

    /// Check if this token contributes characters to the current word
    pub fn is_word_part(&self) -> bool {
        matches!(self, Token::Escaped | Token::Backslash | Token::Word)
    }
}
