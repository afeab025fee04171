//! Base tokenization implementation for the line tokenizer
//!
//! This module provides the raw tokenization using the logos lexer library.
//! This is the entry point where a line of text becomes a raw token stream.

use crate::haconf::lexing::tokens_core::Token;
use logos::Logos;

/// Tokenize one line with location information
///
/// Every byte of the input ends up in exactly one token: logos errors cannot happen
/// with the current token set, but if one did the span is kept as a [`Token::Word`]
/// so nothing is silently lost.
pub fn tokenize(source: &str) -> Vec<(Token, logos::Span)> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        tokens.push((result.unwrap_or(Token::Word), lexer.span()));
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenizes() {
        let tokens = tokenize("bind :80");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0], (Token::Word, 0..4));
        assert_eq!(tokens[1], (Token::Blank, 4..5));
        assert_eq!(tokens[2], (Token::Word, 5..8));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(tokenize(""), vec![]);
    }

    #[test]
    fn test_spans_cover_input() {
        let source = "  acl 'a b' c\\ d # note";
        let tokens = tokenize(source);
        let rebuilt: String = tokens.iter().map(|(_, span)| &source[span.clone()]).collect();
        assert_eq!(rebuilt, source);
    }

    #[test]
    fn test_non_ascii_words() {
        let tokens = tokenize("description café");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[2].0, Token::Word);
    }
}
