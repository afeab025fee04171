//! Line dispatch state machine
//!
//! One forward pass over the input. Each line is tokenized, then offered to the
//! directive parsers of the active section until one accepts it:
//!
//! 1. every keyword that prefixes the tokens, shortest first
//! 2. if nothing accepted and the line starts with `no`, the same from token 1
//! 3. the catch-all, unless disabled
//!
//! An accepting parser can ask for a [`Transition`]: entering another section or
//! switching snippet passthrough on and off. Comment lines inside a section are
//! buffered and attached to whatever comes next: the next directive's record, or,
//! when a header follows, the section being left (indented comments) and the
//! section being entered (unindented comments).
//!
//! All per-parse state lives in [`ParseContext`]; nothing is shared between parses.

use tracing::{debug, trace};

use crate::haconf::directive::extra::COMMENT_KEYWORD;
use crate::haconf::directive::{Record, Transition};
use crate::haconf::lexing::{is_indented, tokenize_line, Line};
use crate::haconf::options::Options;
use crate::haconf::parsers::Parsers;
use crate::haconf::registry::Registry;
use crate::haconf::section::{Naming, SectionHeader, SectionKind};

/// Where the state machine currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Before the first section header
    TopLevel,
    Section(SectionKind),
    /// Inside a snippet block of a section of this kind
    Snippet(SectionKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pending {
    /// Indented comment: belongs to the next directive
    Directive(String),
    /// Unindented comment: belongs to the next section
    Section(String),
}

impl Pending {
    fn text(&self) -> &str {
        match self {
            Pending::Directive(text) | Pending::Section(text) => text,
        }
    }
}

/// Transient state of one parse
#[derive(Debug)]
pub struct ParseContext {
    options: Options,
    state: State,
    active: (SectionKind, String),
    pending: Vec<Pending>,
    last_defaults: Option<String>,
    blank_seen: bool,
}

/// Parse `lines` into `registry`, which is expected to be freshly reset
pub fn process<'a>(registry: &mut Registry, lines: impl IntoIterator<Item = &'a str>) {
    let mut context = ParseContext::new(*registry.options());
    for line in lines {
        context.process_line(registry, line);
    }
    context.finish(registry);
}

impl ParseContext {
    pub fn new(options: Options) -> Self {
        Self {
            options,
            state: State::TopLevel,
            active: (
                SectionKind::Comments,
                SectionKind::Comments.keyword().to_string(),
            ),
            pending: Vec::new(),
            last_defaults: None,
            blank_seen: false,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn process_line(&mut self, registry: &mut Registry, raw: &str) {
        let line = tokenize_line(raw);

        if let State::Snippet(kind) = self.state {
            self.route_snippet(registry, kind, raw, &line);
            return;
        }

        if line.is_blank() {
            self.blank_seen = true;
            return;
        }

        if line.is_comment_only() {
            if let State::Section(_) = self.state {
                let text = line.comment().to_string();
                self.pending.push(if is_indented(raw) {
                    Pending::Directive(text)
                } else {
                    Pending::Section(text)
                });
                return;
            }
            let tokens = [COMMENT_KEYWORD.to_string()];
            self.dispatch(registry, raw, &tokens, line.comment());
            return;
        }

        self.dispatch(registry, raw, &line.tokens, line.comment());
    }

    /// Flush buffered comments onto the active section
    pub fn finish(&mut self, registry: &mut Registry) {
        if let State::Snippet(kind) = self.state {
            debug!(section = %kind, name = %self.active.1, "input ends inside a snippet");
        }
        let pending: Vec<String> = self.pending.drain(..).map(|p| p.text().to_string()).collect();
        if let Some(section) = self.active_section(registry) {
            section.post_comments.extend(pending);
        }
    }

    fn active_section<'r>(&self, registry: &'r mut Registry) -> Option<&'r mut Parsers> {
        registry.section_mut(self.active.0, &self.active.1).ok()
    }

    fn dispatch(&mut self, registry: &mut Registry, raw: &str, tokens: &[String], comment: &str) {
        let pending: Vec<String> = self.pending.iter().map(|p| p.text().to_string()).collect();
        let disable_unprocessed = self.options.disable_unprocessed;

        let Some(section) = self.active_section(registry) else {
            debug!(line = raw, "no active section");
            return;
        };

        let slots = section.candidates(tokens);
        let mut accepted = offer(section, slots, raw, tokens, &pending, comment);
        if accepted.is_none() && tokens.first().is_some_and(|t| t == "no") {
            let slots = section.candidates(&tokens[1..]);
            accepted = offer(section, slots, raw, tokens, &pending, comment);
        }
        if accepted.is_none() && !disable_unprocessed {
            let catch_all = [section.catch_all_slot()];
            accepted = offer(section, catch_all, raw, tokens, &pending, comment);
        }

        let Some(transition) = accepted else {
            debug!(line = raw, "dropping unprocessed line");
            return;
        };
        let blank_line_before = std::mem::take(&mut self.blank_seen);

        match transition {
            Transition::Stay => self.pending.clear(),
            Transition::Enter(header) => self.enter(registry, header, comment, blank_line_before),
            Transition::SnippetBegin => {
                self.pending.clear();
                if let State::Section(kind) = self.state {
                    self.state = State::Snippet(kind);
                }
            }
            Transition::SnippetEnd => {}
        }
    }

    fn enter(
        &mut self,
        registry: &mut Registry,
        header: SectionHeader,
        comment: &str,
        blank_line_before: bool,
    ) {
        let mut post = Vec::new();
        let mut pre = Vec::new();
        for pending in self.pending.drain(..) {
            match pending {
                Pending::Directive(text) => post.push(text),
                Pending::Section(text) => pre.push(text),
            }
        }
        if let Some(left) = self.active_section(registry) {
            left.post_comments.extend(post);
        }
        // `global` is written right after the top-level comments, which is where its
        // leading comments are read back from
        if header.kind == SectionKind::Global {
            for text in pre.drain(..) {
                let kept = registry.insert(
                    SectionKind::Comments,
                    "",
                    COMMENT_KEYWORD,
                    Record::raw(text),
                    None,
                );
                if let Err(err) = kept {
                    debug!(%err, "dropping comment before global");
                }
            }
        }

        let strategy = header.kind.strategy();
        let (name, anonymous) = match header.name {
            Some(name) => {
                registry.release_name(header.kind, &name);
                (name, false)
            }
            None if strategy.naming == Naming::None => (header.kind.keyword().to_string(), false),
            None => (registry.anonymous_name(header.kind), true),
        };
        let from = strategy.wire_inheritance(header.from, self.last_defaults.as_deref(), &self.options);
        if header.kind == SectionKind::Defaults {
            self.last_defaults = if anonymous { None } else { Some(name.clone()) };
        }

        debug!(
            section = %header.kind,
            name = %name,
            from = from.as_deref().unwrap_or(""),
            "entering section"
        );

        let section = registry.section_or_insert(header.kind, &name, anonymous);
        section.pre_comments.extend(pre);
        section.header_comment = comment.to_string();
        section.blank_line_before = blank_line_before;
        section.default_section_name = from;

        self.active = (header.kind, section.name.clone());
        self.state = State::Section(header.kind);
    }

    fn route_snippet(&mut self, registry: &mut Registry, kind: SectionKind, raw: &str, line: &Line) {
        let Some(section) = self.active_section(registry) else {
            return;
        };
        let Some(slot) = section.snippet_slot() else {
            return;
        };
        match section.at_mut(slot).parse(raw, &line.tokens, line.comment()) {
            Ok(Transition::SnippetEnd) => {
                self.blank_seen = false;
                self.state = State::Section(kind);
            }
            Ok(_) => trace!(line = raw, "snippet line"),
            Err(err) => debug!(%err, "snippet refused line"),
        }
    }
}

/// Offer the line to each slot in turn; the first success wins
fn offer(
    section: &mut Parsers,
    slots: impl IntoIterator<Item = usize>,
    raw: &str,
    tokens: &[String],
    pending: &[String],
    comment: &str,
) -> Option<Transition> {
    for slot in slots {
        let directive = section.at_mut(slot);
        match directive.pre_parse(raw, tokens, pending, comment) {
            Ok(transition) => {
                trace!(parser = directive.name(), line = raw, "line accepted");
                return Some(transition);
            }
            Err(err) => trace!(%err, "candidate refused line"),
        }
    }
    None
}
