//! Fixtures and helpers shared by unit and integration tests
//!
//! Configuration text used by more than one test lives here, so a change in what
//! the writer produces is fixed in one place. [`SAMPLES`] lists every fixture by
//! name for table-driven tests:
//!
//! ```rust-example
//! use haconf::haconf::testing::{assert_fixpoint, SAMPLES};
//!
//! for (name, text) in SAMPLES {
//!     assert_fixpoint(name, text);
//! }
//! ```

use crate::haconf::options::Options;
use crate::haconf::processing;
use crate::haconf::registry::Registry;
use crate::haconf::writer;

/// Writer output already: parses and writes back unchanged
pub const ROUND_TRIP_FIXTURE: &str = "\
global
  master-worker
defaults A
  log global
frontend http from A
  mode http
  bind 0.0.0.0:80 name bind_1
  default_backend default_backend
backend default_backend from A
  mode http
";

/// Comments in every position the writer keeps them
pub const COMMENTED_FIXTURE: &str = "\
# _version=3
# generated by the provisioning job
global
  # process model
  daemon
  maxconn 4096 # hard limit
  # end of global

# shared settings
defaults base
  mode http
  timeout connect 5s
  timeout client 30s

frontend www from base # public side
  mode http
  # route api traffic
  acl is_api path_beg /api
  bind :80
  bind :443 ssl crt /etc/ssl/site.pem
  use_backend api if is_api
  default_backend web

backend api from base
  balance roundrobin
  server api1 10.0.0.1:8080 check
  server api2 10.0.0.2:8080 check

backend web from base
  server web1 10.0.1.1:80 check
";

/// Directives no parser knows, kept verbatim at the end of their section
pub const UNPROCESSED_FIXTURE: &str = "\
global
  daemon
  frobnicate now
backend app
  mode tcp
  some-future-keyword 'quoted arg' x\\ y
";

/// A verbatim snippet block inside a backend
pub const SNIPPET_FIXTURE: &str = "\
global
  daemon
backend app
  mode http
  ###_config-snippet_### BEGIN
  http-request set-header X-Env prod
  # raw lines stay as written
  ###_config-snippet_### END
";

/// Anonymous defaults next to a chain of named ones, in write order
pub const DEFAULTS_CHAIN_FIXTURE: &str = "\
global
  daemon
defaults base
  timeout connect 5s
defaults
  mode tcp
defaults web from base
  mode http
frontend www from web
  bind :80
";

/// Every fixture, by name
pub const SAMPLES: &[(&str, &str)] = &[
    ("round-trip", ROUND_TRIP_FIXTURE),
    ("commented", COMMENTED_FIXTURE),
    ("unprocessed", UNPROCESSED_FIXTURE),
    ("snippet", SNIPPET_FIXTURE),
    ("defaults-chain", DEFAULTS_CHAIN_FIXTURE),
];

pub fn parse(text: &str) -> Registry {
    parse_with(text, Options::default())
}

pub fn parse_with(text: &str, options: Options) -> Registry {
    let mut registry = Registry::new(options);
    processing::process(&mut registry, text.lines());
    registry
}

/// Parse with default options and write back
pub fn round_trip(text: &str) -> String {
    writer::render(&parse(text), false)
}

/// Assert `text` is a writer fixpoint, with a line diff on failure.
pub fn assert_fixpoint(name: &str, text: &str) {
    let written = round_trip(text);
    if written == text {
        return;
    }
    let diff: Vec<String> = text
        .lines()
        .zip(written.lines().chain(std::iter::repeat("<missing>")))
        .enumerate()
        .filter(|(_, (want, got))| want != got)
        .map(|(n, (want, got))| format!("  line {}: want {want:?}, got {got:?}", n + 1))
        .collect();
    panic!(
        "fixture {name} is not a fixpoint\n{}\n--- written ---\n{written}",
        diff.join("\n")
    );
}
