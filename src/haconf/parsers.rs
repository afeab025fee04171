//! One section instance
//!
//! A [`Parsers`] owns an empty directive parser for every keyword its kind accepts,
//! built once at construction, plus the section level metadata the writer needs:
//! comments around the header, the header's trailing comment, whether a blank line
//! preceded it and the `from` inheritance edge.
//!
//! Layout of the directive slots:
//!
//! - header parsers of every kind: dispatch only, never written
//! - comments pseudo-section: `# _md5hash`, `# _version`, `#`
//! - the catalog entries of the kind
//! - the snippet passthrough (all kinds but comments)
//! - the catch-all, written last and reachable only as a fallback
//!
//! The write sequence is the slot order of everything but the headers.

mod keyword_trie;

pub use keyword_trie::KeywordTrie;

use crate::haconf::catalog;
use crate::haconf::directive::extra::{
    Comments, ConfigHash, ConfigSnippet, ConfigVersion, SectionHeaderParser, UnProcessed,
    UNPROCESSED_KEYWORD,
};
use crate::haconf::directive::generic::Directive;
use crate::haconf::directive::DirectiveParser;
use crate::haconf::error::{Error, Result};
use crate::haconf::options::Options;
use crate::haconf::section::SectionKind;

#[derive(Debug)]
pub struct Parsers {
    pub kind: SectionKind,
    pub name: String,
    /// The header is written without the name
    pub anonymous: bool,
    /// Comment lines written above the header
    pub pre_comments: Vec<String>,
    /// Comment lines written after the last directive
    pub post_comments: Vec<String>,
    /// Trailing comment of the header line
    pub header_comment: String,
    pub blank_line_before: bool,
    /// Target of the `from` clause
    pub default_section_name: Option<String>,
    directives: Vec<Box<dyn DirectiveParser>>,
    sequence: Vec<usize>,
    keywords: KeywordTrie,
    snippet: Option<usize>,
    catch_all: usize,
}

// Marker keywords are single synthetic tokens that contain a space
fn keyword_path(keyword: &str) -> Vec<&str> {
    if keyword.starts_with('#') {
        vec![keyword]
    } else {
        keyword.split(' ').collect()
    }
}

impl Parsers {
    pub fn new(kind: SectionKind, name: &str, anonymous: bool, options: &Options) -> Self {
        let mut parsers = Parsers {
            kind,
            name: name.to_string(),
            anonymous,
            pre_comments: Vec::new(),
            post_comments: Vec::new(),
            header_comment: String::new(),
            blank_line_before: !kind.is_singleton(),
            default_section_name: None,
            directives: Vec::new(),
            sequence: Vec::new(),
            keywords: KeywordTrie::new(),
            snippet: None,
            catch_all: 0,
        };

        for header in SectionKind::ALL.into_iter().filter(|k| k.has_header()) {
            parsers.register(Box::new(SectionHeaderParser::new(header)), false);
        }
        if kind == SectionKind::Comments {
            parsers.register(Box::new(ConfigHash::new()), true);
            parsers.register(Box::new(ConfigVersion::new()), true);
            parsers.register(Box::new(Comments::new()), true);
        }
        for spec in catalog::directives(kind, options) {
            parsers.register(Box::new(Directive::new(spec)), true);
        }
        if kind != SectionKind::Comments {
            parsers.snippet = Some(parsers.register(Box::new(ConfigSnippet::new()), true));
        }

        parsers.catch_all = parsers.directives.len();
        parsers.directives.push(Box::new(UnProcessed::new()));
        parsers.sequence.push(parsers.catch_all);

        parsers
    }

    fn register(&mut self, directive: Box<dyn DirectiveParser>, written: bool) -> usize {
        let slot = self.directives.len();
        self.keywords.insert(keyword_path(directive.name()), slot);
        self.directives.push(directive);
        if written {
            self.sequence.push(slot);
        }
        slot
    }

    fn slot(&self, keyword: &str) -> Option<usize> {
        if keyword == UNPROCESSED_KEYWORD {
            return Some(self.catch_all);
        }
        self.keywords.get(keyword_path(keyword))
    }

    /// True when a parser is registered under `keyword`
    pub fn has(&self, keyword: &str) -> bool {
        self.slot(keyword).is_some()
    }

    pub fn directive(&self, keyword: &str) -> Result<&dyn DirectiveParser> {
        let slot = self
            .slot(keyword)
            .ok_or_else(|| Error::ParserMissing(keyword.to_string()))?;
        Ok(self.directives[slot].as_ref())
    }

    pub fn directive_mut(&mut self, keyword: &str) -> Result<&mut dyn DirectiveParser> {
        let slot = self
            .slot(keyword)
            .ok_or_else(|| Error::ParserMissing(keyword.to_string()))?;
        Ok(self.directives[slot].as_mut())
    }

    /// Directives in write order
    pub fn written(&self) -> impl Iterator<Item = &dyn DirectiveParser> + '_ {
        self.sequence.iter().map(|&slot| self.directives[slot].as_ref())
    }

    /// Keywords in write order
    pub fn keywords(&self) -> Vec<&str> {
        self.written().map(|directive| directive.name()).collect()
    }

    /// Slots of the keywords that prefix `tokens`, shortest first
    pub(crate) fn candidates(&self, tokens: &[String]) -> Vec<usize> {
        self.keywords.prefixes(tokens).collect()
    }

    pub(crate) fn at_mut(&mut self, slot: usize) -> &mut dyn DirectiveParser {
        self.directives[slot].as_mut()
    }

    pub(crate) fn snippet_slot(&self) -> Option<usize> {
        self.snippet
    }

    pub(crate) fn catch_all_slot(&self) -> usize {
        self.catch_all
    }
}
