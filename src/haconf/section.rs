//! Section kinds and the per-kind strategy table
//!
//! A [`SectionKind`] is the coarse block category a configuration line belongs to.
//! The declaration order of the enum is the order the writer emits kinds in, so a
//! `BTreeMap<SectionKind, _>` iterates in write order.
//!
//! Each kind has a static [`SectionStrategy`] that knows how its header is written
//! (whether a name is required, whether a `from` clause is legal), how an instance is
//! constructed and how its defaults inheritance edge is wired while parsing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::haconf::error::{Error, Result};
use crate::haconf::options::Options;
use crate::haconf::parsers::Parsers;

/// Block categories of the configuration language
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum SectionKind {
    /// Pseudo-section holding the free comments above the first section
    Comments,
    Global,
    Defaults,
    #[serde(rename = "userlist")]
    UserList,
    Peers,
    Mailers,
    Resolvers,
    Cache,
    Ring,
    LogForward,
    HttpErrors,
    Frontend,
    Backend,
    Listen,
    Program,
    FcgiApp,
    CrtStore,
    Traces,
    SpoeAgent,
    SpoeGroup,
    SpoeMessage,
}

impl SectionKind {
    /// Every kind, in write order
    pub const ALL: [SectionKind; 21] = [
        SectionKind::Comments,
        SectionKind::Global,
        SectionKind::Defaults,
        SectionKind::UserList,
        SectionKind::Peers,
        SectionKind::Mailers,
        SectionKind::Resolvers,
        SectionKind::Cache,
        SectionKind::Ring,
        SectionKind::LogForward,
        SectionKind::HttpErrors,
        SectionKind::Frontend,
        SectionKind::Backend,
        SectionKind::Listen,
        SectionKind::Program,
        SectionKind::FcgiApp,
        SectionKind::CrtStore,
        SectionKind::Traces,
        SectionKind::SpoeAgent,
        SectionKind::SpoeGroup,
        SectionKind::SpoeMessage,
    ];

    /// The header keyword
    pub fn keyword(self) -> &'static str {
        match self {
            SectionKind::Comments => "comments",
            SectionKind::Global => "global",
            SectionKind::Defaults => "defaults",
            SectionKind::UserList => "userlist",
            SectionKind::Peers => "peers",
            SectionKind::Mailers => "mailers",
            SectionKind::Resolvers => "resolvers",
            SectionKind::Cache => "cache",
            SectionKind::Ring => "ring",
            SectionKind::LogForward => "log-forward",
            SectionKind::HttpErrors => "http-errors",
            SectionKind::Frontend => "frontend",
            SectionKind::Backend => "backend",
            SectionKind::Listen => "listen",
            SectionKind::Program => "program",
            SectionKind::FcgiApp => "fcgi-app",
            SectionKind::CrtStore => "crt-store",
            SectionKind::Traces => "traces",
            SectionKind::SpoeAgent => "spoe-agent",
            SectionKind::SpoeGroup => "spoe-group",
            SectionKind::SpoeMessage => "spoe-message",
        }
    }

    /// Kinds with exactly one instance, created with the registry
    pub fn is_singleton(self) -> bool {
        matches!(self, SectionKind::Comments | SectionKind::Global)
    }

    /// Kinds that are opened by a header line
    pub fn has_header(self) -> bool {
        self != SectionKind::Comments
    }

    pub fn strategy(self) -> &'static SectionStrategy {
        &STRATEGIES[self as usize]
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for SectionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SectionKind::ALL
            .into_iter()
            .find(|kind| kind.keyword() == s)
            .ok_or_else(|| Error::SectionTypeMissing(s.to_string()))
    }
}

/// A parsed section header line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader {
    pub kind: SectionKind,
    /// `None` for kinds without names and for anonymous sections
    pub name: Option<String>,
    /// Target of a `from <name>` clause
    pub from: Option<String>,
}

/// How a kind's header carries its name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Naming {
    /// `global`, `traces`
    None,
    /// `defaults [name]`, `crt-store [name]`
    Optional,
    /// Every other kind
    Required,
}

/// Static per-kind behaviour used by the state machine and the registry
#[derive(Debug)]
pub struct SectionStrategy {
    pub kind: SectionKind,
    pub naming: Naming,
    /// `from <defaults>` is legal on the header
    pub accepts_from: bool,
    /// Without an explicit `from`, the last named defaults section is used
    pub infers_from: bool,
}

const fn strategy(
    kind: SectionKind,
    naming: Naming,
    accepts_from: bool,
    infers_from: bool,
) -> SectionStrategy {
    SectionStrategy {
        kind,
        naming,
        accepts_from,
        infers_from,
    }
}

// Indexed by discriminant, same order as `SectionKind::ALL`
static STRATEGIES: [SectionStrategy; 21] = [
    strategy(SectionKind::Comments, Naming::None, false, false),
    strategy(SectionKind::Global, Naming::None, false, false),
    strategy(SectionKind::Defaults, Naming::Optional, true, false),
    strategy(SectionKind::UserList, Naming::Required, false, false),
    strategy(SectionKind::Peers, Naming::Required, false, false),
    strategy(SectionKind::Mailers, Naming::Required, false, false),
    strategy(SectionKind::Resolvers, Naming::Required, false, false),
    strategy(SectionKind::Cache, Naming::Required, false, false),
    strategy(SectionKind::Ring, Naming::Required, false, false),
    strategy(SectionKind::LogForward, Naming::Required, false, false),
    strategy(SectionKind::HttpErrors, Naming::Required, false, false),
    strategy(SectionKind::Frontend, Naming::Required, true, true),
    strategy(SectionKind::Backend, Naming::Required, true, true),
    strategy(SectionKind::Listen, Naming::Required, true, true),
    strategy(SectionKind::Program, Naming::Required, false, false),
    strategy(SectionKind::FcgiApp, Naming::Required, false, false),
    strategy(SectionKind::CrtStore, Naming::Optional, false, false),
    strategy(SectionKind::Traces, Naming::None, false, false),
    strategy(SectionKind::SpoeAgent, Naming::Required, false, false),
    strategy(SectionKind::SpoeGroup, Naming::Required, false, false),
    strategy(SectionKind::SpoeMessage, Naming::Required, false, false),
];

impl SectionStrategy {
    /// Read a header line (`tokens[0]` is the kind keyword).
    ///
    /// A header with the wrong number of words is [`Error::InvalidData`]; the state
    /// machine then offers the line to the next candidate.
    pub fn header(&self, tokens: &[String]) -> Result<SectionHeader> {
        let mut args = tokens.get(1..).unwrap_or_default();
        let mut from = None;
        if self.accepts_from {
            if let [rest @ .., keyword, target] = args {
                if keyword == "from" {
                    from = Some(target.clone());
                    args = rest;
                }
            }
        }

        let name = match (self.naming, args) {
            (Naming::None | Naming::Optional, []) => None,
            (Naming::Optional | Naming::Required, [name]) => Some(name.clone()),
            _ => {
                return Err(Error::InvalidData(format!(
                    "malformed {} header: {}",
                    self.kind,
                    tokens.join(" ")
                )))
            }
        };

        Ok(SectionHeader {
            kind: self.kind,
            name,
            from,
        })
    }

    /// A fresh instance with an empty parser for every keyword of the kind
    pub fn construct(&self, name: &str, anonymous: bool, options: &Options) -> Parsers {
        Parsers::new(self.kind, name, anonymous, options)
    }

    /// The inheritance edge a freshly opened section gets while parsing
    pub fn wire_inheritance(
        &self,
        explicit: Option<String>,
        last_defaults: Option<&str>,
        options: &Options,
    ) -> Option<String> {
        if !self.accepts_from {
            return None;
        }
        explicit.or_else(|| {
            if self.infers_from && !options.disable_defaults_inference {
                last_defaults.map(str::to_string)
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn tokens(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_strategy_table_matches_kinds() {
        for (index, kind) in SectionKind::ALL.into_iter().enumerate() {
            assert_eq!(kind as usize, index);
            assert_eq!(kind.strategy().kind, kind);
        }
    }

    #[test]
    fn test_keyword_round_trip() {
        for kind in SectionKind::ALL {
            assert_eq!(kind.keyword().parse::<SectionKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_kind() {
        assert!(matches!(
            "bogus".parse::<SectionKind>(),
            Err(Error::SectionTypeMissing(name)) if name == "bogus"
        ));
    }

    #[test]
    fn test_serde_names_match_keywords() {
        for kind in SectionKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.keyword()));
        }
    }

    #[test]
    fn test_write_order_is_declaration_order() {
        assert!(SectionKind::Comments < SectionKind::Global);
        assert!(SectionKind::Defaults < SectionKind::UserList);
        assert!(SectionKind::HttpErrors < SectionKind::Frontend);
        assert!(SectionKind::FcgiApp < SectionKind::CrtStore);
    }

    #[rstest]
    #[case(SectionKind::Global, "global", None, None)]
    #[case(SectionKind::Defaults, "defaults", None, None)]
    #[case(SectionKind::Defaults, "defaults A", Some("A"), None)]
    #[case(SectionKind::Defaults, "defaults A from B", Some("A"), Some("B"))]
    #[case(SectionKind::Defaults, "defaults from B", None, Some("B"))]
    #[case(SectionKind::Frontend, "frontend http from A", Some("http"), Some("A"))]
    #[case(SectionKind::Backend, "backend app", Some("app"), None)]
    #[case(SectionKind::CrtStore, "crt-store", None, None)]
    fn test_header_parsing(
        #[case] kind: SectionKind,
        #[case] line: &str,
        #[case] name: Option<&str>,
        #[case] from: Option<&str>,
    ) {
        let header = kind.strategy().header(&tokens(line)).unwrap();
        assert_eq!(header.kind, kind);
        assert_eq!(header.name.as_deref(), name);
        assert_eq!(header.from.as_deref(), from);
    }

    #[rstest]
    #[case(SectionKind::Global, "global extra")]
    #[case(SectionKind::Backend, "backend")]
    #[case(SectionKind::Backend, "backend a b")]
    #[case(SectionKind::Resolvers, "resolvers dns from A")]
    fn test_malformed_headers(#[case] kind: SectionKind, #[case] line: &str) {
        assert!(matches!(
            kind.strategy().header(&tokens(line)),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_wire_inheritance() {
        let options = Options::default();
        let backend = SectionKind::Backend.strategy();
        assert_eq!(
            backend.wire_inheritance(None, Some("A"), &options),
            Some("A".to_string())
        );
        assert_eq!(
            backend.wire_inheritance(Some("B".into()), Some("A"), &options),
            Some("B".to_string())
        );

        let no_inference = Options::default().disable_defaults_inference(true);
        assert_eq!(backend.wire_inheritance(None, Some("A"), &no_inference), None);

        let defaults = SectionKind::Defaults.strategy();
        assert_eq!(defaults.wire_inheritance(None, Some("A"), &options), None);
        assert_eq!(
            defaults.wire_inheritance(Some("A".into()), None, &options),
            Some("A".to_string())
        );

        let peers = SectionKind::Peers.strategy();
        assert_eq!(peers.wire_inheritance(Some("A".into()), Some("A"), &options), None);
    }
}
