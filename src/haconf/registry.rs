//! Section registry
//!
//! Every section instance, grouped by kind and keyed by name. The `comments` and
//! `global` singletons exist from construction on and survive everything but a
//! reset. Kinds without header names (`global`, `traces`, `comments`) are stored
//! under their keyword, and the accessors ignore the name passed for them.
//!
//! The accessor methods here do no locking; [`ConfigParser`] wraps each of them in
//! its mutex.
//!
//! [`ConfigParser`]: crate::haconf::engine::ConfigParser

use std::collections::BTreeMap;

use crate::haconf::directive::extra::UNPROCESSED_KEYWORD;
use crate::haconf::directive::{Data, DirectiveParser, Record, ResultLine, Value};
use crate::haconf::error::{Error, Result};
use crate::haconf::lexing::{is_single_token, tokenize_line};
use crate::haconf::options::Options;
use crate::haconf::parsers::Parsers;
use crate::haconf::section::{Naming, SectionKind};
use crate::haconf::sorter;

#[derive(Debug)]
pub struct Registry {
    options: Options,
    sections: BTreeMap<SectionKind, BTreeMap<String, Parsers>>,
}

/// Storage key of a section: nameless kinds live under their keyword
pub fn section_key(kind: SectionKind, name: &str) -> &str {
    if kind.strategy().naming == Naming::None {
        kind.keyword()
    } else {
        name
    }
}

fn attribute(err: Error) -> Error {
    match err {
        Error::ParserMissing(keyword) => Error::AttributeNotFound(keyword),
        other => other,
    }
}

impl Registry {
    pub fn new(options: Options) -> Self {
        let mut registry = Registry {
            options,
            sections: BTreeMap::new(),
        };
        registry.reset();
        registry
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Drop every section and recreate the singletons
    pub fn reset(&mut self) {
        self.sections.clear();
        for kind in [SectionKind::Comments, SectionKind::Global] {
            let section = kind.strategy().construct(kind.keyword(), false, &self.options);
            self.sections
                .entry(kind)
                .or_default()
                .insert(kind.keyword().to_string(), section);
        }
    }

    pub fn contains(&self, kind: SectionKind, name: &str) -> bool {
        self.sections
            .get(&kind)
            .is_some_and(|named| named.contains_key(section_key(kind, name)))
    }

    pub fn section(&self, kind: SectionKind, name: &str) -> Result<&Parsers> {
        self.sections
            .get(&kind)
            .and_then(|named| named.get(section_key(kind, name)))
            .ok_or_else(|| Error::SectionMissing(format!("{kind} {name}")))
    }

    pub fn section_mut(&mut self, kind: SectionKind, name: &str) -> Result<&mut Parsers> {
        self.sections
            .get_mut(&kind)
            .and_then(|named| named.get_mut(section_key(kind, name)))
            .ok_or_else(|| Error::SectionMissing(format!("{kind} {name}")))
    }

    /// The existing section, or a freshly constructed one registered under `name`
    pub fn section_or_insert(
        &mut self,
        kind: SectionKind,
        name: &str,
        anonymous: bool,
    ) -> &mut Parsers {
        let options = self.options;
        let key = section_key(kind, name).to_string();
        self.sections
            .entry(kind)
            .or_default()
            .entry(key.clone())
            .or_insert_with(|| kind.strategy().construct(&key, anonymous, &options))
    }

    /// Sections of one kind, ordered by name
    pub fn sections(&self, kind: SectionKind) -> impl Iterator<Item = &Parsers> + '_ {
        self.sections.get(&kind).into_iter().flat_map(|named| named.values())
    }

    /// A name for an unnamed `defaults` or `crt-store` section not taken yet
    pub fn anonymous_name(&self, kind: SectionKind) -> String {
        let prefix = format!("unnamed_{}_", kind.keyword().replace('-', "_"));
        let mut n = 1usize;
        loop {
            let candidate = format!("{prefix}{n}");
            if !self.contains(kind, &candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Move an anonymous section registered under `name` to a fresh synthetic name,
    /// so an explicitly named header does not take it over
    pub fn release_name(&mut self, kind: SectionKind, name: &str) {
        let taken = self
            .sections
            .get(&kind)
            .and_then(|named| named.get(name))
            .is_some_and(|section| section.anonymous);
        if !taken {
            return;
        }
        let fresh = self.anonymous_name(kind);
        if let Some(named) = self.sections.get_mut(&kind) {
            if let Some(mut section) = named.remove(name) {
                section.name = fresh.clone();
                named.insert(fresh, section);
            }
        }
    }

    pub fn names(&self, kind: SectionKind) -> Vec<String> {
        self.sections(kind).map(|section| section.name.clone()).collect()
    }

    /// Register an empty section. An empty name on a kind with an optional header
    /// name creates an anonymous section under a fresh synthetic name.
    pub fn create(&mut self, kind: SectionKind, name: &str) -> Result<()> {
        if kind == SectionKind::Comments {
            return Err(Error::SectionTypeMissing(kind.to_string()));
        }
        if self.contains(kind, name) {
            return Err(Error::SectionAlreadyExists(format!("{kind} {name}")));
        }
        match (kind.strategy().naming, name) {
            (Naming::None, _) => {
                self.section_or_insert(kind, name, false);
            }
            (Naming::Optional, "") => {
                let synthetic = self.anonymous_name(kind);
                self.section_or_insert(kind, &synthetic, true);
            }
            (Naming::Required, "") => {
                return Err(Error::InvalidData(format!("{kind} sections need a name")));
            }
            (_, name) if !is_single_token(name) => {
                return Err(Error::InvalidData(format!(
                    "{kind} name {name:?} is not a single token"
                )));
            }
            (_, name) => {
                self.section_or_insert(kind, name, false);
            }
        }
        Ok(())
    }

    pub fn delete(&mut self, kind: SectionKind, name: &str) -> Result<()> {
        if kind.is_singleton() {
            return Err(Error::InvalidData(format!("{kind} cannot be deleted")));
        }
        let removed = self
            .sections
            .get_mut(&kind)
            .and_then(|named| named.remove(section_key(kind, name)));
        if removed.is_none() {
            return Err(Error::SectionMissing(format!("{kind} {name}")));
        }

        if kind == SectionKind::Defaults {
            for section in self.sections.values_mut().flat_map(|named| named.values_mut()) {
                if section.default_section_name.as_deref() == Some(name) {
                    section.default_section_name = None;
                }
            }
        }
        Ok(())
    }

    /// `(name, from)` pairs of the defaults sections, `""` when there is no edge
    pub fn defaults_edges(&self) -> Vec<(String, String)> {
        self.sections(SectionKind::Defaults)
            .map(|section| {
                (
                    section.name.clone(),
                    section.default_section_name.clone().unwrap_or_default(),
                )
            })
            .collect()
    }

    pub fn defaults_from_get(&self, kind: SectionKind, name: &str) -> Result<Option<String>> {
        let section = self.section(kind, name)?;
        if !kind.strategy().accepts_from {
            return Err(Error::InvalidData(format!("{kind} sections have no from clause")));
        }
        Ok(section.default_section_name.clone())
    }

    /// Set or clear (`None` or `""`) the `from` edge of a section.
    ///
    /// The target has to exist, and on `defaults` the new edge must keep the
    /// inheritance graph acyclic.
    pub fn defaults_from_set(&mut self, kind: SectionKind, name: &str, from: Option<&str>) -> Result<()> {
        if !kind.strategy().accepts_from {
            return Err(Error::InvalidData(format!("{kind} sections have no from clause")));
        }
        self.section(kind, name)?;
        let from = from.filter(|target| !target.is_empty());

        if let Some(target) = from {
            if !self.contains(SectionKind::Defaults, target) {
                return Err(Error::FromDefaultsSectionMissing(target.to_string()));
            }
            if kind == SectionKind::Defaults {
                let mut edges = self.defaults_edges();
                for edge in edges.iter_mut().filter(|edge| edge.0 == name) {
                    edge.1 = target.to_string();
                }
                sorter::sort(&edges)?;
            }
        }

        self.section_mut(kind, name)?.default_section_name = from.map(str::to_string);
        Ok(())
    }

    fn directive(&self, kind: SectionKind, name: &str, keyword: &str) -> Result<&dyn DirectiveParser> {
        self.section(kind, name)?.directive(keyword).map_err(attribute)
    }

    fn directive_mut(
        &mut self,
        kind: SectionKind,
        name: &str,
        keyword: &str,
    ) -> Result<&mut dyn DirectiveParser> {
        self.section_mut(kind, name)?
            .directive_mut(keyword)
            .map_err(attribute)
    }

    pub fn get(&self, kind: SectionKind, name: &str, keyword: &str) -> Result<Data> {
        self.directive(kind, name, keyword)?.get()
    }

    pub fn get_one(&self, kind: SectionKind, name: &str, keyword: &str, index: usize) -> Result<Record> {
        self.directive(kind, name, keyword)?.get_one(index)
    }

    /// Rendered lines of one directive. An unknown keyword is `ParserMissing` here.
    pub fn get_result(&self, kind: SectionKind, name: &str, keyword: &str) -> Result<Vec<ResultLine>> {
        let (lines, _) = self.section(kind, name)?.directive(keyword)?.result_all()?;
        Ok(lines)
    }

    pub fn get_pre_comments(&self, kind: SectionKind, name: &str, keyword: &str) -> Result<Vec<String>> {
        self.directive(kind, name, keyword)?.pre_comments()
    }

    pub fn set(
        &mut self,
        kind: SectionKind,
        name: &str,
        keyword: &str,
        data: Option<Data>,
        index: Option<usize>,
    ) -> Result<()> {
        if keyword == UNPROCESSED_KEYWORD {
            let records: &[Record] = match &data {
                Some(Data::Single(record)) => std::slice::from_ref(record),
                Some(Data::List(records)) => records.as_slice(),
                None => &[],
            };
            for record in records {
                self.check_unclaimed(kind, record)?;
            }
        }
        self.directive_mut(kind, name, keyword)?.set(data, index)
    }

    /// Refuse a catch-all line some other parser of the section would take on reparse
    fn check_unclaimed(&self, kind: SectionKind, record: &Record) -> Result<()> {
        let Value::Raw(raw) = &record.value else {
            return Ok(());
        };
        let line = tokenize_line(raw);
        let mut scratch = kind.strategy().construct("", false, &self.options);
        let mut claimed = |tokens: &[String]| {
            scratch
                .candidates(tokens)
                .into_iter()
                .any(|slot| scratch.at_mut(slot).parse(raw, tokens, line.comment()).is_ok())
        };
        let negated = match line.tokens.split_first() {
            Some((first, rest)) if first == "no" => claimed(rest),
            _ => false,
        };
        if claimed(&line.tokens) || negated {
            return Err(Error::InvalidData(format!(
                "{raw:?} belongs to a {kind} directive, not the catch-all"
            )));
        }
        Ok(())
    }

    pub fn set_pre_comments(
        &mut self,
        kind: SectionKind,
        name: &str,
        keyword: &str,
        comments: Vec<String>,
    ) -> Result<()> {
        self.directive_mut(kind, name, keyword)?.set_pre_comments(comments)
    }

    pub fn insert(
        &mut self,
        kind: SectionKind,
        name: &str,
        keyword: &str,
        record: Record,
        index: Option<usize>,
    ) -> Result<()> {
        if keyword == UNPROCESSED_KEYWORD {
            self.check_unclaimed(kind, &record)?;
        }
        self.directive_mut(kind, name, keyword)?.insert(record, index)
    }

    pub fn delete_entry(&mut self, kind: SectionKind, name: &str, keyword: &str, index: usize) -> Result<()> {
        self.directive_mut(kind, name, keyword)?.delete(index)
    }

    /// Whether sections of `kind` accept `keyword`
    pub fn has_parser(&self, kind: SectionKind, keyword: &str) -> bool {
        match self.sections(kind).next() {
            Some(section) => section.has(keyword),
            None => kind
                .strategy()
                .construct("", false, &self.options)
                .has(keyword),
        }
    }
}
