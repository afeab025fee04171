//! Directive parser contract
//!
//! A directive parser owns the data of one keyword inside one section instance: it
//! turns tokenized lines into [`Record`]s, hands them out through the accessor calls,
//! and renders them back into [`ResultLine`]s for the writer.
//!
//! Storage is either singleton (`mode`, `maxconn`: a new line replaces the old value)
//! or repeatable (`server`, `acl`: lines accumulate in source order). Both live in a
//! [`Store`]; implementations only provide parsing, rendering and an optional value
//! check, and inherit the rest of the contract from the trait's provided methods.
//!
//! Values are exchanged as the [`Value`] tagged union. A directive refuses a variant
//! that does not match its shape with [`Error::InvalidData`], so callers never need to
//! downcast.
//!
//! Implementations:
//! - `generic`: catalog driven flag/text/int/words directives
//! - `extra`: section headers, free comments, version and hash markers, snippets and
//!   the catch-all passthrough

pub mod extra;
pub mod generic;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::haconf::error::{Error, Result};
use crate::haconf::lexing::tokenize_line;
use crate::haconf::section::SectionHeader;

/// What the state machine should do after a directive accepted a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The line was stored; stay in the current section
    Stay,
    /// A section header: leave the current section and open this one
    Enter(SectionHeader),
    /// Start storing lines verbatim until the end marker
    SnippetBegin,
    /// Leave snippet passthrough
    SnippetEnd,
}

/// Payload of one directive occurrence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Keyword only (`daemon`, `option httplog`), possibly written as `no <keyword>`
    Flag { negated: bool },
    /// Exactly one argument (`mode http`)
    Text(String),
    /// Exactly one integer argument (`maxconn 2000`)
    Int(i64),
    /// One or more arguments kept as tokens (`server web1 10.0.0.1:80 check`)
    Words(Vec<String>),
    /// A line kept verbatim
    Raw(String),
    /// A block of lines kept verbatim (config snippets)
    Lines(Vec<String>),
}

impl Value {
    /// Name of the variant, used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Flag { .. } => "flag",
            Value::Text(_) => "text",
            Value::Int(_) => "int",
            Value::Words(_) => "words",
            Value::Raw(_) => "raw",
            Value::Lines(_) => "lines",
        }
    }
}

/// One stored occurrence of a directive with its comments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub value: Value,
    /// Inline trailing comment, `""` when absent
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
    /// Comment lines written right above this occurrence
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre_comments: Vec<String>,
}

impl Record {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            comment: String::new(),
            pre_comments: Vec::new(),
        }
    }

    pub fn flag() -> Self {
        Self::new(Value::Flag { negated: false })
    }

    pub fn negated() -> Self {
        Self::new(Value::Flag { negated: true })
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::new(Value::Text(value.into()))
    }

    pub fn int(value: i64) -> Self {
        Self::new(Value::Int(value))
    }

    pub fn words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Value::Words(words.into_iter().map(Into::into).collect()))
    }

    pub fn raw(line: impl Into<String>) -> Self {
        Self::new(Value::Raw(line.into()))
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn with_pre_comments(mut self, comments: Vec<String>) -> Self {
        self.pre_comments = comments;
        self
    }
}

/// Everything a directive currently holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Data {
    /// Value of a singleton directive
    Single(Record),
    /// Values of a repeatable directive, in order
    List(Vec<Record>),
}

impl Data {
    pub fn into_records(self) -> Vec<Record> {
        match self {
            Data::Single(record) => vec![record],
            Data::List(records) => records,
        }
    }

    pub fn single(&self) -> Option<&Record> {
        match self {
            Data::Single(record) => Some(record),
            Data::List(_) => None,
        }
    }

    pub fn list(&self) -> Option<&[Record]> {
        match self {
            Data::Single(_) => None,
            Data::List(records) => Some(records),
        }
    }
}

/// One output line: `data` followed by ` # comment` when the comment is set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultLine {
    pub data: String,
    pub comment: String,
}

impl ResultLine {
    pub fn new(data: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            comment: comment.into(),
        }
    }

    /// A line made only of a comment: `# text`, or a bare `#` for an empty one
    pub fn comment_line(text: &str) -> Self {
        if text.is_empty() {
            Self::new("#", "")
        } else {
            Self::new(format!("# {text}"), "")
        }
    }
}

impl fmt::Display for ResultLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.comment.is_empty() {
            write!(f, "{}", self.data)
        } else {
            write!(f, "{} # {}", self.data, self.comment)
        }
    }
}

/// Record storage shared by every directive implementation
#[derive(Debug, Clone, Default)]
pub struct Store {
    records: Vec<Record>,
    repeatable: bool,
    pre_comments: Vec<String>,
}

impl Store {
    /// Storage for a directive that keeps only its latest value
    pub fn single() -> Self {
        Self::default()
    }

    /// Storage for a directive that keeps every occurrence
    pub fn list() -> Self {
        Self {
            repeatable: true,
            ..Self::default()
        }
    }

    pub fn is_repeatable(&self) -> bool {
        self.repeatable
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Comment lines attached to the directive as a whole
    pub fn pre_comments(&self) -> &[String] {
        &self.pre_comments
    }

    /// Keep a freshly parsed record according to the storage mode
    pub fn store(&mut self, record: Record) {
        if !self.repeatable {
            self.records.clear();
        }
        self.records.push(record);
    }

    /// The record stored most recently, if any
    pub fn last_mut(&mut self) -> Option<&mut Record> {
        self.records.last_mut()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.pre_comments.clear();
    }
}

/// Refuse text that would spill into a line of its own when written
pub(crate) fn single_line(text: &str) -> Result<()> {
    if text.contains(['\n', '\r']) {
        return Err(Error::InvalidData(format!("line break in {text:?}")));
    }
    Ok(())
}

/// Refuse text that does not read back as the same comment line
pub(crate) fn comment_text(text: &str) -> Result<()> {
    single_line(text)?;
    let line = tokenize_line(&ResultLine::comment_line(text).data);
    if !line.tokens.is_empty() || line.comment.as_deref() != Some(text) {
        return Err(Error::InvalidData(format!("{text:?} does not read back as a comment")));
    }
    Ok(())
}

fn check_text(record: &Record) -> Result<()> {
    single_line(&record.comment)?;
    if record.comment.trim() != record.comment {
        return Err(Error::InvalidData(format!(
            "comment {:?} has surrounding whitespace",
            record.comment
        )));
    }
    record.pre_comments.iter().try_for_each(|c| comment_text(c))
}

/// The contract every directive parser fulfils
///
/// Required: [`name`](Self::name), [`parse`](Self::parse), [`render`](Self::render)
/// and access to the backing [`Store`]. Everything else has a provided
/// implementation in terms of those.
pub trait DirectiveParser: Send + fmt::Debug {
    /// Keyword this parser is registered under
    fn name(&self) -> &str;

    /// Persist the tokens of one line, or report a section transition
    fn parse(&mut self, line: &str, tokens: &[String], comment: &str) -> Result<Transition>;

    /// Render one stored record, without its comment
    fn render(&self, record: &Record) -> String;

    fn store(&self) -> &Store;

    fn store_mut(&mut self) -> &mut Store;

    /// Reject values this directive cannot hold
    fn check(&self, _value: &Value) -> Result<()> {
        Ok(())
    }

    /// Reset to the empty state. Calling it twice is the same as calling it once.
    fn init(&mut self) {
        self.store_mut().clear();
    }

    /// Like [`parse`](Self::parse), also attaching the comment lines collected since
    /// the previous directive to the record the line produced
    fn pre_parse(
        &mut self,
        line: &str,
        tokens: &[String],
        pre_comments: &[String],
        comment: &str,
    ) -> Result<Transition> {
        let transition = self.parse(line, tokens, comment)?;
        if transition == Transition::Stay && !pre_comments.is_empty() {
            if let Some(record) = self.store_mut().last_mut() {
                record.pre_comments = pre_comments.to_vec();
            }
        }
        Ok(transition)
    }

    fn get(&self) -> Result<Data> {
        let store = self.store();
        if store.is_empty() {
            return Err(Error::Fetch);
        }
        if store.is_repeatable() {
            Ok(Data::List(store.records().to_vec()))
        } else {
            Ok(Data::Single(store.records()[0].clone()))
        }
    }

    fn get_one(&self, index: usize) -> Result<Record> {
        self.store().records().get(index).cloned().ok_or(Error::Fetch)
    }

    /// Replace data. `None` clears (the whole directive, or one entry when an index is
    /// given); a list replaces every entry; a single record replaces the entry at
    /// `index`, or is appended to a repeatable directive when no index is given.
    fn set(&mut self, data: Option<Data>, index: Option<usize>) -> Result<()> {
        match data {
            None => match index {
                None => {
                    self.store_mut().records.clear();
                    Ok(())
                }
                Some(index) => self.delete(index),
            },
            Some(Data::List(records)) => {
                if !self.store().is_repeatable() {
                    return Err(Error::InvalidData(format!(
                        "{} holds a single value",
                        self.name()
                    )));
                }
                for record in &records {
                    self.check(&record.value)?;
                    check_text(record)?;
                }
                self.store_mut().records = records;
                Ok(())
            }
            Some(Data::Single(record)) => {
                self.check(&record.value)?;
                check_text(&record)?;
                let store = self.store_mut();
                if !store.repeatable {
                    store.records = vec![record];
                    return Ok(());
                }
                match index {
                    None => store.records.push(record),
                    Some(index) => {
                        let slot = store.records.get_mut(index).ok_or(Error::Fetch)?;
                        *slot = record;
                    }
                }
                Ok(())
            }
        }
    }

    /// Insert at `index` (appending when `None`). A singleton is simply replaced.
    fn insert(&mut self, record: Record, index: Option<usize>) -> Result<()> {
        self.check(&record.value)?;
        check_text(&record)?;
        let store = self.store_mut();
        if !store.repeatable {
            store.records = vec![record];
            return Ok(());
        }
        match index {
            None => store.records.push(record),
            Some(index) if index <= store.records.len() => store.records.insert(index, record),
            Some(_) => return Err(Error::Fetch),
        }
        Ok(())
    }

    fn delete(&mut self, index: usize) -> Result<()> {
        let store = self.store_mut();
        if index >= store.records.len() {
            return Err(Error::Fetch);
        }
        store.records.remove(index);
        Ok(())
    }

    /// Comment lines attached to the directive as a whole
    fn pre_comments(&self) -> Result<Vec<String>> {
        Ok(self.store().pre_comments.clone())
    }

    fn set_pre_comments(&mut self, comments: Vec<String>) -> Result<()> {
        for comment in &comments {
            comment_text(comment)?;
        }
        self.store_mut().pre_comments = comments;
        Ok(())
    }

    /// Render every record: comment lines first, then the directive line itself.
    /// The second value holds the directive level pre-comments.
    fn result_all(&self) -> Result<(Vec<ResultLine>, Vec<String>)> {
        let store = self.store();
        if store.is_empty() {
            return Err(Error::Fetch);
        }
        let mut lines = Vec::with_capacity(store.records().len());
        for record in store.records() {
            lines.extend(record.pre_comments.iter().map(|c| ResultLine::comment_line(c)));
            lines.push(ResultLine::new(self.render(record), record.comment.clone()));
        }
        Ok((lines, store.pre_comments.clone()))
    }
}
