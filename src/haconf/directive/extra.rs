//! Structural directive parsers
//!
//! These are not HAProxy directives but pieces of the file structure the engine has
//! to route like directives:
//!
//! - [`SectionHeaderParser`]: recognises `backend app from A` and asks for a transition
//! - [`Comments`]: free-standing comment lines at the top of the file
//! - [`ConfigVersion`] / [`ConfigHash`]: the `# _version=` and `# _md5hash=` headers
//! - [`ConfigSnippet`]: marker-delimited blocks kept verbatim
//! - [`UnProcessed`]: the catch-all for lines nothing else accepts

use once_cell::sync::Lazy;
use regex::Regex;

use crate::haconf::directive::{
    comment_text, single_line, DirectiveParser, Record, ResultLine, Store, Transition, Value,
};
use crate::haconf::error::{Error, Result};
use crate::haconf::lexing::{tokenize_line, HASH_MARKER, SNIPPET_MARKER, VERSION_MARKER};
use crate::haconf::section::SectionKind;

/// Keyword of the free comment parser
pub const COMMENT_KEYWORD: &str = "#";
/// Keyword the catch-all is addressed by through the accessor API
pub const UNPROCESSED_KEYWORD: &str = "unprocessed";

static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^_version\s*=\s*(-?\d+)$").expect("valid regex"));
static HASH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^_md5hash\s*=\s*(\S+)$").expect("valid regex"));

/// Header line of one section kind
#[derive(Debug)]
pub struct SectionHeaderParser {
    kind: SectionKind,
    store: Store,
}

impl SectionHeaderParser {
    pub fn new(kind: SectionKind) -> Self {
        Self {
            kind,
            store: Store::single(),
        }
    }
}

impl DirectiveParser for SectionHeaderParser {
    fn name(&self) -> &str {
        self.kind.keyword()
    }

    fn parse(&mut self, line: &str, tokens: &[String], _comment: &str) -> Result<Transition> {
        let header = self
            .kind
            .strategy()
            .header(tokens)
            .map_err(|err| Error::parse(self.kind.keyword(), line, err.to_string()))?;
        Ok(Transition::Enter(header))
    }

    // Headers are written by the writer from the section itself; nothing is stored here
    fn render(&self, _record: &Record) -> String {
        self.kind.keyword().to_string()
    }

    fn check(&self, _value: &Value) -> Result<()> {
        Err(Error::InvalidData(format!(
            "{} headers are managed through the sections API",
            self.kind
        )))
    }

    fn store(&self) -> &Store {
        &self.store
    }

    fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }
}

/// Free-standing comment lines
#[derive(Debug)]
pub struct Comments {
    store: Store,
}

impl Comments {
    pub fn new() -> Self {
        Self {
            store: Store::list(),
        }
    }
}

impl Default for Comments {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectiveParser for Comments {
    fn name(&self) -> &str {
        COMMENT_KEYWORD
    }

    fn parse(&mut self, line: &str, tokens: &[String], comment: &str) -> Result<Transition> {
        if tokens != [COMMENT_KEYWORD] {
            return Err(Error::parse(COMMENT_KEYWORD, line, "not a comment line"));
        }
        self.store.store(Record::raw(comment));
        Ok(Transition::Stay)
    }

    fn render(&self, record: &Record) -> String {
        match &record.value {
            Value::Raw(text) => ResultLine::comment_line(text).data,
            other => other.kind_name().to_string(),
        }
    }

    fn check(&self, value: &Value) -> Result<()> {
        match value {
            Value::Raw(text) => comment_text(text),
            other => Err(Error::InvalidData(format!(
                "comments hold raw text, got {}",
                other.kind_name()
            ))),
        }
    }

    fn store(&self) -> &Store {
        &self.store
    }

    fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }
}

/// `# _version=<n>`
#[derive(Debug)]
pub struct ConfigVersion {
    store: Store,
}

impl ConfigVersion {
    pub fn new() -> Self {
        Self {
            store: Store::single(),
        }
    }
}

impl Default for ConfigVersion {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectiveParser for ConfigVersion {
    fn name(&self) -> &str {
        VERSION_MARKER
    }

    fn parse(&mut self, line: &str, tokens: &[String], comment: &str) -> Result<Transition> {
        if tokens != [VERSION_MARKER] {
            return Err(Error::parse(VERSION_MARKER, line, "not a version line"));
        }
        let version = VERSION_RE
            .captures(comment)
            .and_then(|caps| caps[1].parse::<i64>().ok())
            .filter(|n| comment == format!("_version={n}"))
            .ok_or_else(|| Error::parse(VERSION_MARKER, line, "malformed version"))?;
        self.store.store(Record::int(version));
        Ok(Transition::Stay)
    }

    fn render(&self, record: &Record) -> String {
        match &record.value {
            Value::Int(n) => format!("{VERSION_MARKER}={n}"),
            other => other.kind_name().to_string(),
        }
    }

    fn check(&self, value: &Value) -> Result<()> {
        match value {
            Value::Int(_) => Ok(()),
            other => Err(Error::InvalidData(format!(
                "version is an integer, got {}",
                other.kind_name()
            ))),
        }
    }

    fn store(&self) -> &Store {
        &self.store
    }

    fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }
}

/// `# _md5hash=<hex>`
#[derive(Debug)]
pub struct ConfigHash {
    store: Store,
}

impl ConfigHash {
    pub fn new() -> Self {
        Self {
            store: Store::single(),
        }
    }
}

impl Default for ConfigHash {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectiveParser for ConfigHash {
    fn name(&self) -> &str {
        HASH_MARKER
    }

    fn parse(&mut self, line: &str, tokens: &[String], comment: &str) -> Result<Transition> {
        if tokens != [HASH_MARKER] {
            return Err(Error::parse(HASH_MARKER, line, "not a hash line"));
        }
        let hash = HASH_RE
            .captures(comment)
            .map(|caps| caps[1].to_string())
            .filter(|hash| comment == format!("_md5hash={hash}"))
            .ok_or_else(|| Error::parse(HASH_MARKER, line, "malformed hash"))?;
        self.store.store(Record::text(hash));
        Ok(Transition::Stay)
    }

    fn render(&self, record: &Record) -> String {
        match &record.value {
            Value::Text(hash) => format!("{HASH_MARKER}={hash}"),
            other => other.kind_name().to_string(),
        }
    }

    fn check(&self, value: &Value) -> Result<()> {
        match value {
            Value::Text(hash) if !hash.is_empty() && !hash.contains(char::is_whitespace) => Ok(()),
            other => Err(Error::InvalidData(format!(
                "hash is one hex word, got {}",
                other.kind_name()
            ))),
        }
    }

    fn store(&self) -> &Store {
        &self.store
    }

    fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }
}

/// Marker-delimited blocks stored line by line, without interpretation
///
/// The state machine routes the `BEGIN` marker here like any directive, then hands
/// every following line (blank lines too) to [`parse`](DirectiveParser::parse) until
/// the `END` marker. Each block is one record holding a [`Value::Lines`].
#[derive(Debug)]
pub struct ConfigSnippet {
    store: Store,
    open: bool,
}

impl ConfigSnippet {
    pub fn new() -> Self {
        Self {
            store: Store::list(),
            open: false,
        }
    }
}

impl Default for ConfigSnippet {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectiveParser for ConfigSnippet {
    fn name(&self) -> &str {
        SNIPPET_MARKER
    }

    fn parse(&mut self, line: &str, tokens: &[String], comment: &str) -> Result<Transition> {
        let marker = tokens == [SNIPPET_MARKER];
        if !self.open {
            if marker && comment == "BEGIN" {
                self.open = true;
                self.store.store(Record::new(Value::Lines(Vec::new())));
                return Ok(Transition::SnippetBegin);
            }
            return Err(Error::parse(SNIPPET_MARKER, line, "outside of a snippet"));
        }
        if marker && comment == "END" {
            self.open = false;
            return Ok(Transition::SnippetEnd);
        }

        // Inside a block everything is content, a nested BEGIN marker included
        match self.store.last_mut().map(|record| &mut record.value) {
            Some(Value::Lines(lines)) => {
                lines.push(line.trim().to_string());
                Ok(Transition::Stay)
            }
            _ => Err(Error::parse(SNIPPET_MARKER, line, "no open block")),
        }
    }

    fn pre_parse(
        &mut self,
        line: &str,
        tokens: &[String],
        pre_comments: &[String],
        comment: &str,
    ) -> Result<Transition> {
        let transition = self.parse(line, tokens, comment)?;
        if transition == Transition::SnippetBegin && !pre_comments.is_empty() {
            if let Some(record) = self.store.last_mut() {
                record.pre_comments = pre_comments.to_vec();
            }
        }
        Ok(transition)
    }

    fn render(&self, record: &Record) -> String {
        match &record.value {
            Value::Lines(lines) => lines.join("\n"),
            other => other.kind_name().to_string(),
        }
    }

    fn check(&self, value: &Value) -> Result<()> {
        let Value::Lines(lines) = value else {
            return Err(Error::InvalidData(format!(
                "snippets hold lines, got {}",
                value.kind_name()
            )));
        };
        for line in lines {
            single_line(line)?;
            if line.trim() != line || tokenize_line(line).tokens == [SNIPPET_MARKER] {
                return Err(Error::InvalidData(format!("{line:?} cannot be a snippet line")));
            }
        }
        Ok(())
    }

    fn init(&mut self) {
        self.store.clear();
        self.open = false;
    }

    fn result_all(&self) -> Result<(Vec<ResultLine>, Vec<String>)> {
        if self.store.is_empty() {
            return Err(Error::Fetch);
        }
        let mut out = Vec::new();
        for record in self.store.records() {
            out.extend(record.pre_comments.iter().map(|c| ResultLine::comment_line(c)));
            out.push(ResultLine::new(format!("{SNIPPET_MARKER} BEGIN"), ""));
            if let Value::Lines(lines) = &record.value {
                out.extend(lines.iter().map(|l| ResultLine::new(l.clone(), "")));
            }
            out.push(ResultLine::new(format!("{SNIPPET_MARKER} END"), ""));
        }
        Ok((out, self.store.pre_comments().to_vec()))
    }

    fn store(&self) -> &Store {
        &self.store
    }

    fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }
}

/// Catch-all: keeps any line verbatim, trimmed of its indentation
#[derive(Debug)]
pub struct UnProcessed {
    store: Store,
}

impl UnProcessed {
    pub fn new() -> Self {
        Self {
            store: Store::list(),
        }
    }
}

impl Default for UnProcessed {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectiveParser for UnProcessed {
    fn name(&self) -> &str {
        UNPROCESSED_KEYWORD
    }

    fn parse(&mut self, line: &str, _tokens: &[String], _comment: &str) -> Result<Transition> {
        let line = line.trim();
        if line.is_empty() {
            return Err(Error::parse(UNPROCESSED_KEYWORD, line, "blank line"));
        }
        self.store.store(Record::raw(line));
        Ok(Transition::Stay)
    }

    fn render(&self, record: &Record) -> String {
        match &record.value {
            Value::Raw(line) => line.clone(),
            other => other.kind_name().to_string(),
        }
    }

    /// Only the shape of the line is checked here. Whether another parser of the
    /// section would claim it is up to the registry.
    fn check(&self, value: &Value) -> Result<()> {
        let Value::Raw(line) = value else {
            return Err(Error::InvalidData(format!(
                "unprocessed lines are raw text, got {}",
                value.kind_name()
            )));
        };
        single_line(line)?;
        if line.trim() != line || tokenize_line(line).tokens.is_empty() {
            return Err(Error::InvalidData(format!(
                "{line:?} does not read back as an unprocessed line"
            )));
        }
        Ok(())
    }

    fn store(&self) -> &Store {
        &self.store
    }

    fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::haconf::directive::Data;

    fn feed(parser: &mut dyn DirectiveParser, line: &str) -> Result<Transition> {
        let parsed = tokenize_line(line);
        let tokens = if parsed.is_comment_only() {
            vec![COMMENT_KEYWORD.to_string()]
        } else {
            parsed.tokens.clone()
        };
        parser.parse(line, &tokens, parsed.comment())
    }

    fn rendered(parser: &dyn DirectiveParser) -> Vec<String> {
        let (lines, _) = parser.result_all().unwrap();
        lines.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_header_transition() {
        let mut header = SectionHeaderParser::new(SectionKind::Backend);
        let transition = feed(&mut header, "backend app from A").unwrap();
        let Transition::Enter(target) = transition else {
            panic!("expected a section transition");
        };
        assert_eq!(target.kind, SectionKind::Backend);
        assert_eq!(target.name.as_deref(), Some("app"));
        assert_eq!(target.from.as_deref(), Some("A"));
        assert!(matches!(header.get(), Err(Error::Fetch)));
    }

    #[test]
    fn test_header_refuses_malformed() {
        let mut header = SectionHeaderParser::new(SectionKind::Backend);
        assert!(matches!(feed(&mut header, "backend"), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_free_comments() {
        let mut comments = Comments::new();
        feed(&mut comments, "# hello").unwrap();
        feed(&mut comments, "#").unwrap();
        assert_eq!(rendered(&comments), vec!["# hello", "#"]);
    }

    #[test]
    fn test_version() {
        let mut version = ConfigVersion::new();
        feed(&mut version, "# _version=7").unwrap();
        assert_eq!(version.get().unwrap(), Data::Single(Record::int(7)));
        assert_eq!(rendered(&version), vec!["# _version=7"]);
        assert!(feed(&mut version, "# _version = 8").is_err());
        assert!(feed(&mut version, "# _version=x").is_err());
    }

    #[test]
    fn test_hash() {
        let mut hash = ConfigHash::new();
        feed(&mut hash, "# _md5hash=d41d8cd98f00b204e9800998ecf8427e").unwrap();
        assert_eq!(
            rendered(&hash),
            vec!["# _md5hash=d41d8cd98f00b204e9800998ecf8427e"]
        );
    }

    #[test]
    fn test_snippet_block() {
        let mut snippet = ConfigSnippet::new();
        assert_eq!(
            feed(&mut snippet, "  ###_config-snippet_### BEGIN").unwrap(),
            Transition::SnippetBegin
        );
        feed(&mut snippet, "  anything goes # here").unwrap();
        feed(&mut snippet, "").unwrap();
        assert_eq!(
            feed(&mut snippet, "  ###_config-snippet_### END").unwrap(),
            Transition::SnippetEnd
        );
        assert_eq!(
            rendered(&snippet),
            vec![
                "###_config-snippet_### BEGIN",
                "anything goes # here",
                "",
                "###_config-snippet_### END",
            ]
        );
        assert!(feed(&mut snippet, "stray line").is_err());
        assert!(feed(&mut snippet, "###_config-snippet_### END").is_err());
    }

    #[test]
    fn test_snippet_init_closes_block() {
        let mut snippet = ConfigSnippet::new();
        feed(&mut snippet, "###_config-snippet_### BEGIN").unwrap();
        snippet.init();
        assert!(feed(&mut snippet, "stray line").is_err());
        assert!(matches!(snippet.result_all(), Err(Error::Fetch)));
    }

    #[test]
    fn test_unprocessed_keeps_line() {
        let mut unprocessed = UnProcessed::new();
        feed(&mut unprocessed, "   frobnicate  the   thing # why").unwrap();
        assert_eq!(rendered(&unprocessed), vec!["frobnicate  the   thing # why"]);
        assert!(unprocessed.insert(Record::raw("   "), None).is_err());
    }

    #[test]
    fn test_unprocessed_refuses_lines_that_read_back_differently() {
        let mut unprocessed = UnProcessed::new();
        for line in ["# only a comment", "  indented", "a\nb"] {
            assert!(unprocessed.insert(Record::raw(line), None).is_err(), "{line:?}");
        }
        unprocessed.insert(Record::raw("frobnicate # why"), None).unwrap();
    }

    #[test]
    fn test_comments_refuse_marker_text() {
        let mut comments = Comments::new();
        for text in ["_version=2", "_md5hash=ab", "##_config-snippet_### BEGIN", " x"] {
            assert!(comments.insert(Record::raw(text), None).is_err(), "{text:?}");
        }
        comments.insert(Record::raw("version 2 follows"), None).unwrap();
        assert_eq!(rendered(&comments), vec!["# version 2 follows"]);
    }

    #[test]
    fn test_snippet_refuses_end_marker_line() {
        let mut snippet = ConfigSnippet::new();
        fn block(lines: &[&str]) -> Record {
            Record::new(Value::Lines(lines.iter().map(|l| l.to_string()).collect()))
        }
        assert!(snippet
            .insert(block(&["a", "###_config-snippet_### END"]), None)
            .is_err());
        assert!(snippet.insert(block(&["  a"]), None).is_err());
        snippet.insert(block(&["a # b", ""]), None).unwrap();
        assert_eq!(
            rendered(&snippet),
            vec![
                "###_config-snippet_### BEGIN",
                "a # b",
                "",
                "###_config-snippet_### END",
            ]
        );
    }
}
