//! Registry to text
//!
//! Output order is fixed and independent of the source order:
//!
//! - the comments pseudo-section, unindented (hash, version, free comments, then
//!   unprocessed top-level lines)
//! - `global`
//! - every other kind in [`SectionKind`] declaration order; `defaults` sections in
//!   dependency order, the others by name
//!
//! Inside a section, directives come in their write sequence, each rendered with two
//! spaces of indentation. The writer never fails: when the defaults graph is broken
//! it logs the problem and falls back to name order.

use md5::{Digest, Md5};
use tracing::warn;

use crate::haconf::directive::{Data, Record, ResultLine};
use crate::haconf::lexing::HASH_MARKER;
use crate::haconf::options::Options;
use crate::haconf::parsers::Parsers;
use crate::haconf::registry::Registry;
use crate::haconf::section::{Naming, SectionKind};
use crate::haconf::sorter;

const INDENT: &str = "  ";

/// Render the registry. With `skip_hash` the stored `# _md5hash` line is left out.
pub fn render(registry: &Registry, skip_hash: bool) -> String {
    let options = registry.options();
    let mut out: Vec<String> = Vec::new();

    for kind in SectionKind::ALL {
        match kind {
            SectionKind::Comments => {
                for section in registry.sections(kind) {
                    write_comments(&mut out, section, skip_hash);
                }
            }
            SectionKind::Defaults => {
                for section in ordered_defaults(registry) {
                    write_section(&mut out, section, options);
                }
            }
            _ => {
                for section in registry.sections(kind) {
                    write_section(&mut out, section, options);
                }
            }
        }
    }

    let mut text = out.join("\n");
    if !text.is_empty() {
        text.push('\n');
    }
    text
}

/// Render with a `# _md5hash=<hex>` first line and remember the hash, so a later plain
/// [`render`] gives the same text.
pub fn render_with_hash(registry: &mut Registry) -> String {
    let body = render(registry, true);
    let hash = format!("{:x}", Md5::digest(body.as_bytes()));
    let stored = registry.set(
        SectionKind::Comments,
        "",
        HASH_MARKER,
        Some(Data::Single(Record::text(hash.clone()))),
        None,
    );
    if let Err(err) = stored {
        warn!(%err, "cannot remember the written hash");
    }
    format!("{HASH_MARKER}={hash}\n{body}")
}

fn ordered_defaults(registry: &Registry) -> Vec<&Parsers> {
    match sorter::sort(&registry.defaults_edges()) {
        Ok(order) => order
            .iter()
            .filter_map(|name| registry.section(SectionKind::Defaults, name).ok())
            .collect(),
        Err(err) => {
            warn!(%err, "cannot order defaults sections, writing them by name");
            registry.sections(SectionKind::Defaults).collect()
        }
    }
}

fn write_comments(out: &mut Vec<String>, section: &Parsers, skip_hash: bool) {
    for directive in section.written() {
        if skip_hash && directive.name() == HASH_MARKER {
            continue;
        }
        let Ok((lines, pre_comments)) = directive.result_all() else {
            continue;
        };
        out.extend(
            pre_comments
                .iter()
                .map(|c| ResultLine::comment_line(c).to_string()),
        );
        out.extend(lines.iter().map(ToString::to_string));
    }
}

/// `<kind>[ <name>][ from <defaults>]`
pub fn header_line(section: &Parsers, options: &Options) -> String {
    let kind = section.kind;
    let mut line = kind.keyword().to_string();

    let named = kind.strategy().naming != Naming::None
        && !section.anonymous
        && !(kind == SectionKind::Defaults && options.no_named_defaults);
    if named {
        line.push(' ');
        line.push_str(&section.name);
    }

    if !options.no_named_defaults {
        if let Some(from) = section.default_section_name.as_deref().filter(|f| !f.is_empty()) {
            line.push_str(" from ");
            line.push_str(from);
        }
    }
    line
}

fn write_section(out: &mut Vec<String>, section: &Parsers, options: &Options) {
    if section.blank_line_before {
        out.push(String::new());
    }
    out.extend(
        section
            .pre_comments
            .iter()
            .map(|c| ResultLine::comment_line(c).to_string()),
    );
    out.push(ResultLine::new(header_line(section, options), section.header_comment.clone()).to_string());

    for directive in section.written() {
        let Ok((lines, pre_comments)) = directive.result_all() else {
            continue;
        };
        for comment in &pre_comments {
            out.push(indented(&ResultLine::comment_line(comment)));
        }
        for line in &lines {
            out.push(indented(line));
        }
    }

    for comment in &section.post_comments {
        out.push(indented(&ResultLine::comment_line(comment)));
    }
}

fn indented(line: &ResultLine) -> String {
    if line.data.is_empty() && line.comment.is_empty() {
        String::new()
    } else {
        format!("{INDENT}{line}")
    }
}
