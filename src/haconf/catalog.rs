//! Directive catalog
//!
//! The keywords each section kind understands, with the shape of their arguments and
//! whether they may repeat. The engine builds one generic directive parser per entry
//! when a section instance is constructed; the entry order is the write order.
//!
//! Anything not listed here is still kept: lines nobody claims go to the catch-all
//! passthrough and are written back verbatim.

use crate::haconf::options::Options;
use crate::haconf::section::SectionKind;

/// Argument shape of a generic directive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Keyword only; may be written as `no <keyword>`
    Flag,
    /// Exactly one argument
    Text,
    /// Exactly one integer argument
    Int,
    /// One or more arguments
    Words,
    /// Keyword with optional arguments (`option forwardfor [except ...]`)
    Args,
}

/// One catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectiveSpec {
    /// Space separated keyword, e.g. `timeout connect`
    pub keyword: &'static str,
    pub shape: Shape,
    pub repeatable: bool,
}

const fn one(keyword: &'static str, shape: Shape) -> DirectiveSpec {
    DirectiveSpec {
        keyword,
        shape,
        repeatable: false,
    }
}

const fn many(keyword: &'static str, shape: Shape) -> DirectiveSpec {
    DirectiveSpec {
        keyword,
        shape,
        repeatable: true,
    }
}

use Shape::{Args, Flag, Int, Text, Words};

static GLOBAL: &[DirectiveSpec] = &[
    one("daemon", Flag),
    one("master-worker", Flag),
    one("nbthread", Int),
    one("maxconn", Int),
    one("user", Text),
    one("group", Text),
    one("chroot", Text),
    one("pidfile", Text),
    one("hard-stop-after", Text),
    many("log", Words),
    many("stats socket", Words),
    one("stats timeout", Text),
    one("ssl-default-bind-ciphers", Text),
    one("ssl-default-bind-options", Words),
    one("tune.ssl.default-dh-param", Int),
    many("cpu-map", Words),
    many("lua-load", Words),
    many("setenv", Words),
];

// Shared by defaults, frontend, backend and listen
static PROXY: &[DirectiveSpec] = &[
    one("mode", Text),
    one("maxconn", Int),
    many("log", Words),
    one("option httplog", Flag),
    one("option tcplog", Flag),
    one("option dontlognull", Flag),
    one("option http-server-close", Flag),
    one("option redispatch", Flag),
    one("option forwardfor", Args),
    one("option httpchk", Args),
    one("retries", Int),
    one("timeout connect", Text),
    one("timeout client", Text),
    one("timeout server", Text),
    one("timeout queue", Text),
    one("timeout http-request", Text),
    one("timeout http-keep-alive", Text),
    one("timeout check", Text),
    one("timeout tunnel", Text),
    many("acl", Words),
    many("http-request", Words),
    many("http-response", Words),
    many("tcp-request", Words),
    many("errorfile", Words),
    one("stats enable", Flag),
    one("stats uri", Text),
];

static FRONTEND_SIDE: &[DirectiveSpec] = &[
    many("bind", Words),
    many("use_backend", Words),
    one("default_backend", Text),
];

static BACKEND_SIDE: &[DirectiveSpec] = &[
    one("balance", Words),
    one("cookie", Words),
    one("default-server", Words),
    many("server", Words),
];

static HTTP_CHECK_V2: &[DirectiveSpec] = &[many("http-check", Words)];

static HTTP_CHECK_LEGACY: &[DirectiveSpec] = &[
    one("http-check expect", Words),
    one("http-check disable-on-404", Flag),
    one("http-check send-state", Flag),
];

static RESOLVERS: &[DirectiveSpec] = &[
    many("nameserver", Words),
    one("accepted_payload_size", Int),
    one("resolve_retries", Int),
    one("parse-resolv-conf", Flag),
    many("hold", Words),
    one("timeout resolve", Text),
    one("timeout retry", Text),
];

static USERLIST: &[DirectiveSpec] = &[many("group", Words), many("user", Words)];

static PEERS: &[DirectiveSpec] = &[
    one("disabled", Flag),
    one("enabled", Flag),
    one("bind", Words),
    one("default-server", Words),
    many("peer", Words),
    many("server", Words),
    many("table", Words),
];

static MAILERS: &[DirectiveSpec] = &[one("timeout mail", Text), many("mailer", Words)];

static CACHE: &[DirectiveSpec] = &[
    one("total-max-size", Int),
    one("max-object-size", Int),
    one("max-age", Int),
    one("max-secondary-entries", Int),
    one("process-vary", Text),
];

static PROGRAM: &[DirectiveSpec] = &[
    one("command", Words),
    one("user", Text),
    one("group", Text),
    one("option start-on-reload", Flag),
];

static HTTP_ERRORS: &[DirectiveSpec] = &[many("errorfile", Words)];

static RING: &[DirectiveSpec] = &[
    one("description", Words),
    one("format", Text),
    one("maxlen", Int),
    one("size", Int),
    one("timeout connect", Text),
    one("timeout server", Text),
    many("server", Words),
];

static LOG_FORWARD: &[DirectiveSpec] = &[
    one("backlog", Int),
    one("maxconn", Int),
    one("timeout client", Text),
    many("bind", Words),
    many("dgram-bind", Words),
    many("log", Words),
];

static FCGI_APP: &[DirectiveSpec] = &[
    one("docroot", Text),
    one("index", Text),
    one("path-info", Text),
    one("log-stderr", Words),
    one("option keep-conn", Flag),
    one("option get-values", Flag),
    one("option mpxs-conns", Flag),
    one("option max-reqs", Int),
    many("acl", Words),
    many("pass-header", Words),
    many("set-param", Words),
];

static CRT_STORE: &[DirectiveSpec] = &[
    one("crt-base", Text),
    one("key-base", Text),
    many("load", Words),
];

static TRACES: &[DirectiveSpec] = &[many("trace", Words)];

static SPOE_AGENT: &[DirectiveSpec] = &[
    many("messages", Words),
    many("groups", Words),
    one("use-backend", Text),
    one("timeout hello", Text),
    one("timeout idle", Text),
    one("timeout processing", Text),
    one("option var-prefix", Text),
    one("option async", Flag),
    one("option pipelining", Flag),
    one("maxconnrate", Int),
    one("maxerrrate", Int),
    one("max-frame-size", Int),
    one("register-var-names", Words),
    many("log", Words),
];

static SPOE_GROUP: &[DirectiveSpec] = &[many("messages", Words)];

static SPOE_MESSAGE: &[DirectiveSpec] = &[
    many("acl", Words),
    one("args", Words),
    one("event", Words),
];

/// Catalog entries for one kind, in write order
pub fn directives(kind: SectionKind, options: &Options) -> Vec<DirectiveSpec> {
    let http_check = if options.use_v2_http_check {
        HTTP_CHECK_V2
    } else {
        HTTP_CHECK_LEGACY
    };

    let groups: Vec<&[DirectiveSpec]> = match kind {
        SectionKind::Comments => vec![],
        SectionKind::Global => vec![GLOBAL],
        SectionKind::Defaults => vec![PROXY, BACKEND_SIDE, http_check],
        SectionKind::Frontend => vec![PROXY, FRONTEND_SIDE],
        SectionKind::Backend => vec![PROXY, BACKEND_SIDE, http_check],
        SectionKind::Listen => vec![PROXY, FRONTEND_SIDE, BACKEND_SIDE, http_check],
        SectionKind::Resolvers => vec![RESOLVERS],
        SectionKind::UserList => vec![USERLIST],
        SectionKind::Peers => vec![PEERS],
        SectionKind::Mailers => vec![MAILERS],
        SectionKind::Cache => vec![CACHE],
        SectionKind::Program => vec![PROGRAM],
        SectionKind::HttpErrors => vec![HTTP_ERRORS],
        SectionKind::Ring => vec![RING],
        SectionKind::LogForward => vec![LOG_FORWARD],
        SectionKind::FcgiApp => vec![FCGI_APP],
        SectionKind::CrtStore => vec![CRT_STORE],
        SectionKind::Traces => vec![TRACES],
        SectionKind::SpoeAgent => vec![SPOE_AGENT],
        SectionKind::SpoeGroup => vec![SPOE_GROUP],
        SectionKind::SpoeMessage => vec![SPOE_MESSAGE],
    };

    groups.iter().flat_map(|group| group.iter().copied()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_keywords_unique_per_kind() {
        for options in [Options::default(), Options::default().use_v2_http_check(true)] {
            for kind in SectionKind::ALL {
                let entries = directives(kind, &options);
                let unique: HashSet<_> = entries.iter().map(|e| e.keyword).collect();
                assert_eq!(unique.len(), entries.len(), "duplicate keyword in {kind}");
            }
        }
    }

    #[test]
    fn test_http_check_flavours() {
        let legacy = directives(SectionKind::Backend, &Options::default());
        assert!(legacy.iter().any(|e| e.keyword == "http-check expect"));
        assert!(!legacy.iter().any(|e| e.keyword == "http-check"));

        let v2 = directives(SectionKind::Backend, &Options::default().use_v2_http_check(true));
        let entry = v2.iter().find(|e| e.keyword == "http-check").unwrap();
        assert!(entry.repeatable);
        assert!(!v2.iter().any(|e| e.keyword == "http-check expect"));
    }

    #[test]
    fn test_frontend_has_no_servers() {
        let frontend = directives(SectionKind::Frontend, &Options::default());
        assert!(!frontend.iter().any(|e| e.keyword == "server"));
        assert!(frontend.iter().any(|e| e.keyword == "bind"));

        let listen = directives(SectionKind::Listen, &Options::default());
        assert!(listen.iter().any(|e| e.keyword == "server"));
        assert!(listen.iter().any(|e| e.keyword == "bind"));
    }

    #[test]
    fn test_comments_have_no_generic_directives() {
        assert!(directives(SectionKind::Comments, &Options::default()).is_empty());
    }
}
