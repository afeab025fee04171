//! Word-keyed trie used for directive dispatch
//!
//! Keywords are one to three words (`mode`, `timeout connect`,
//! `option http-server-close`). Walking the tokens of a line down the trie yields
//! every registered keyword that is a prefix of the line, shortest first, without
//! building any intermediate strings.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct KeywordTrie {
    root: TrieNode,
}

#[derive(Debug, Default)]
struct TrieNode {
    slot: Option<usize>,
    children: HashMap<String, TrieNode>,
}

impl KeywordTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `slot` under the given word path. A later insert on the same path wins.
    pub fn insert<'a>(&mut self, path: impl IntoIterator<Item = &'a str>, slot: usize) {
        let mut node = &mut self.root;
        for word in path {
            node = node.children.entry(word.to_string()).or_default();
        }
        node.slot = Some(slot);
    }

    /// Exact lookup
    pub fn get<'a>(&self, path: impl IntoIterator<Item = &'a str>) -> Option<usize> {
        let mut node = &self.root;
        for word in path {
            node = node.children.get(word)?;
        }
        node.slot
    }

    /// Slots of every keyword that prefixes `tokens`, shortest keyword first
    pub fn prefixes<'t>(&'t self, tokens: &'t [String]) -> impl Iterator<Item = usize> + 't {
        let mut node = Some(&self.root);
        tokens.iter().map_while(move |token| {
            let next = node?.children.get(token.as_str())?;
            node = Some(next);
            Some(next.slot)
        })
        .flatten()
    }
}
