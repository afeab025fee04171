//! # haconf
//!
//! A parser and writer for HAProxy configuration files.
//!
//! File Layout
//!
//! The crate is organised the way the data flows through it:
//!
//! src/haconf
//!   ├── lexing       One line of text -> tokens + trailing comment
//!   ├── directive    The directive parser contract and the generic/extra parsers
//!   ├── catalog      Which keywords every section kind understands
//!   ├── parsers      One section instance (`Parsers`) and its keyword trie
//!   ├── registry     Every section instance, by kind and name
//!   ├── processing   The line-by-line state machine
//!   ├── sorter       Ordering of `defaults` sections by their `from` edges
//!   ├── writer       Registry -> text
//!   └── engine       The locked public API (`ConfigParser`)
//!
//! The contract is byte fidelity: any text the writer produces parses back into a
//! registry that writes the same text again.
//!
//! For test fixtures shared between unit and integration tests, see the
//! [testing module](haconf::testing).

#![allow(rustdoc::invalid_html_tags)]

pub mod haconf;

pub use haconf::directive::{Data, Record, ResultLine, Value};
pub use haconf::engine::ConfigParser;
pub use haconf::error::{Error, Result};
pub use haconf::options::Options;
pub use haconf::section::SectionKind;
