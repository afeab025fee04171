//! Catalog driven directive parser
//!
//! One [`Directive`] serves every catalog entry: the entry's keyword says how many
//! leading tokens to match, its [`Shape`] says what the remaining tokens must look
//! like. Lines that do not fit are refused with a parse error so the state machine
//! can hand them to the next candidate (ultimately the catch-all).

use crate::haconf::catalog::{DirectiveSpec, Shape};
use crate::haconf::directive::{DirectiveParser, Record, Store, Transition, Value};
use crate::haconf::error::{Error, Result};
use crate::haconf::lexing::is_single_token;

#[derive(Debug)]
pub struct Directive {
    spec: DirectiveSpec,
    words: usize,
    store: Store,
}

impl Directive {
    pub fn new(spec: DirectiveSpec) -> Self {
        let store = if spec.repeatable {
            Store::list()
        } else {
            Store::single()
        };
        Self {
            words: spec.keyword.split(' ').count(),
            spec,
            store,
        }
    }

    pub fn shape(&self) -> Shape {
        self.spec.shape
    }

    fn value(&self, line: &str, negated: bool, args: &[String]) -> Result<Value> {
        let fail = |message: &str| Err(Error::parse(self.spec.keyword, line, message));
        if negated && self.spec.shape != Shape::Flag {
            return fail("only flags can be negated");
        }
        match (self.spec.shape, args) {
            (Shape::Flag, []) => Ok(Value::Flag { negated }),
            (Shape::Flag, _) => fail("takes no arguments"),
            (Shape::Text, [arg]) => Ok(Value::Text(arg.clone())),
            (Shape::Text, _) => fail("expects exactly one argument"),
            // Only canonical integers, so the rendered line is the parsed line
            (Shape::Int, [arg]) => match arg.parse::<i64>() {
                Ok(n) if n.to_string() == *arg => Ok(Value::Int(n)),
                _ => fail("expects an integer"),
            },
            (Shape::Int, _) => fail("expects exactly one argument"),
            (Shape::Words, []) => fail("expects arguments"),
            (Shape::Words | Shape::Args, args) => Ok(Value::Words(args.to_vec())),
        }
    }
}

impl DirectiveParser for Directive {
    fn name(&self) -> &str {
        self.spec.keyword
    }

    fn parse(&mut self, line: &str, tokens: &[String], comment: &str) -> Result<Transition> {
        let (negated, rest) = match tokens.split_first() {
            Some((first, rest)) if first == "no" => (true, rest),
            _ => (false, tokens),
        };

        let matches_keyword = rest.len() >= self.words
            && self
                .spec
                .keyword
                .split(' ')
                .zip(rest)
                .all(|(word, token)| word == token);
        if !matches_keyword {
            return Err(Error::parse(self.spec.keyword, line, "keyword mismatch"));
        }

        let value = self.value(line, negated, &rest[self.words..])?;
        self.store.store(Record::new(value).with_comment(comment));
        Ok(Transition::Stay)
    }

    fn render(&self, record: &Record) -> String {
        let keyword = self.spec.keyword;
        match &record.value {
            Value::Flag { negated: true } => format!("no {keyword}"),
            Value::Flag { negated: false } => keyword.to_string(),
            Value::Text(text) => format!("{keyword} {text}"),
            Value::Int(n) => format!("{keyword} {n}"),
            Value::Words(words) if words.is_empty() => keyword.to_string(),
            Value::Words(words) => format!("{keyword} {}", words.join(" ")),
            Value::Raw(raw) => raw.clone(),
            Value::Lines(lines) => lines.join(" "),
        }
    }

    fn check(&self, value: &Value) -> Result<()> {
        let fits = match (self.spec.shape, value) {
            (Shape::Flag, Value::Flag { .. }) => true,
            (Shape::Text, Value::Text(text)) => is_single_token(text),
            (Shape::Int, Value::Int(_)) => true,
            (Shape::Words, Value::Words(words)) => {
                !words.is_empty() && words.iter().all(|w| is_single_token(w))
            }
            (Shape::Args, Value::Words(words)) => words.iter().all(|w| is_single_token(w)),
            _ => false,
        };
        if fits {
            Ok(())
        } else {
            Err(Error::InvalidData(format!(
                "{} cannot hold {} data {:?}",
                self.spec.keyword,
                value.kind_name(),
                value
            )))
        }
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
    use crate::haconf::lexing::tokenize_line;
    use rstest::rstest;

    fn directive(keyword: &'static str, shape: Shape, repeatable: bool) -> Directive {
        Directive::new(DirectiveSpec {
            keyword,
            shape,
            repeatable,
        })
    }

    fn feed(directive: &mut Directive, line: &str) -> Result<Transition> {
        let parsed = tokenize_line(line);
        directive.parse(line, &parsed.tokens, parsed.comment())
    }

    fn rendered(directive: &Directive) -> Vec<String> {
        let (lines, _) = directive.result_all().unwrap();
        lines.iter().map(ToString::to_string).collect()
    }

    #[rstest]
    #[case("mode", Shape::Text, "mode http")]
    #[case("maxconn", Shape::Int, "maxconn 2000")]
    #[case("maxconn", Shape::Int, "maxconn -1")]
    #[case("option httplog", Shape::Flag, "option httplog")]
    #[case("option httplog", Shape::Flag, "no option httplog")]
    #[case("option forwardfor", Shape::Args, "option forwardfor")]
    #[case("option forwardfor", Shape::Args, "option forwardfor except 127.0.0.1")]
    #[case("timeout connect", Shape::Text, "timeout connect 5s # short")]
    #[case("bind", Shape::Words, "bind 0.0.0.0:80 name bind_1")]
    #[case("acl", Shape::Words, "acl is_api path_beg '/api v2'")]
    fn test_round_trips_line(#[case] keyword: &'static str, #[case] shape: Shape, #[case] line: &str) {
        let mut d = directive(keyword, shape, false);
        assert_eq!(feed(&mut d, line).unwrap(), Transition::Stay);
        assert_eq!(rendered(&d), vec![line.to_string()]);
    }

    #[rstest]
    #[case("maxconn", Shape::Int, "maxconn lots")]
    #[case("maxconn", Shape::Int, "maxconn +5")]
    #[case("maxconn", Shape::Int, "maxconn 1 2")]
    #[case("mode", Shape::Text, "mode")]
    #[case("mode", Shape::Text, "no mode http")]
    #[case("option httplog", Shape::Flag, "option httplog now")]
    #[case("bind", Shape::Words, "bind")]
    #[case("timeout connect", Shape::Text, "timeout client 5s")]
    fn test_refuses_line(#[case] keyword: &'static str, #[case] shape: Shape, #[case] line: &str) {
        let mut d = directive(keyword, shape, false);
        assert!(matches!(feed(&mut d, line), Err(Error::Parse { .. })));
        assert!(matches!(d.get(), Err(Error::Fetch)));
    }

    #[test]
    fn test_negated_flag_value() {
        let mut d = directive("option httplog", Shape::Flag, false);
        feed(&mut d, "no option httplog").unwrap();
        assert_eq!(d.get().unwrap(), Data::Single(Record::negated()));
    }

    #[test]
    fn test_repeatable_keeps_order() {
        let mut d = directive("server", Shape::Words, true);
        feed(&mut d, "server b 10.0.0.2:80").unwrap();
        feed(&mut d, "server a 10.0.0.1:80 # first").unwrap();
        assert_eq!(
            rendered(&d),
            vec!["server b 10.0.0.2:80", "server a 10.0.0.1:80 # first"]
        );
    }

    #[test]
    fn test_check_rejects_wrong_variant() {
        let mut d = directive("maxconn", Shape::Int, false);
        let result = d.set(Some(Data::Single(Record::text("many"))), None);
        assert!(matches!(result, Err(Error::InvalidData(_))));
        d.set(Some(Data::Single(Record::int(10))), None).unwrap();
        assert_eq!(rendered(&d), vec!["maxconn 10"]);
    }

    #[test]
    fn test_check_rejects_text_that_would_split() {
        let mut d = directive("mode", Shape::Text, false);
        assert!(d.insert(Record::text("http tcp"), None).is_err());
        assert!(d.insert(Record::text("a#b"), None).is_err());
        assert!(d.insert(Record::text(""), None).is_err());
        d.insert(Record::text("'http tcp'"), None).unwrap();
    }

    #[test]
    fn test_check_words() {
        let mut d = directive("server", Shape::Words, true);
        assert!(d.insert(Record::words(Vec::<String>::new()), None).is_err());
        assert!(d.insert(Record::words(["a b"]), None).is_err());
        d.insert(Record::words(["web1", "10.0.0.1:80"]), None).unwrap();

        let mut args = directive("option forwardfor", Shape::Args, false);
        args.insert(Record::words(Vec::<String>::new()), None).unwrap();
        assert_eq!(rendered(&args), vec!["option forwardfor"]);
    }
}
