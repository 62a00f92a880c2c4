//! Typed context-free grammars, composed from fragments and validated once.
//!
//! A [`Fragment`] is a list of productions. [`Grammar::compose`] merges the
//! productions of several fragments (same left-hand side means more
//! alternatives) and rejects compositions that reference undefined symbols or
//! contain a cycle, so every valid grammar derives a finite set of sentences.

use std::collections::{BTreeMap, HashMap};

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::GrammarError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    Terminal(String),
    NonTerminal(String),
}

/// Terminal symbol.
pub fn t(text: impl Into<String>) -> Symbol {
    Symbol::Terminal(text.into())
}

/// Non-terminal symbol.
pub fn n(name: impl Into<String>) -> Symbol {
    Symbol::NonTerminal(name.into())
}

#[derive(Debug, Clone, Default)]
pub struct Fragment {
    rules: Vec<(String, Vec<Symbol>)>,
}

impl Fragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one alternative for `lhs`.
    pub fn alt(mut self, lhs: &str, symbols: impl IntoIterator<Item = Symbol>) -> Self {
        self.rules
            .push((lhs.to_string(), symbols.into_iter().collect()));
        self
    }

    /// Add one single-terminal alternative for `lhs` per word.
    pub fn words<I>(mut self, lhs: &str, words: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for word in words {
            self.rules
                .push((lhs.to_string(), vec![t(word.as_ref())]));
        }
        self
    }
}

#[derive(Debug, Clone)]
pub struct Grammar {
    start: String,
    rules: BTreeMap<String, Vec<Vec<Symbol>>>,
}

#[derive(Clone, Copy, PartialEq)]
enum Visit {
    InProgress,
    Done,
}

impl Grammar {
    pub fn compose(start: &str, fragments: &[Fragment]) -> Result<Self, GrammarError> {
        let mut rules: BTreeMap<String, Vec<Vec<Symbol>>> = BTreeMap::new();
        for (lhs, rhs) in fragments.iter().flat_map(|f| f.rules.iter()) {
            let alternatives = rules.entry(lhs.clone()).or_default();
            if !alternatives.contains(rhs) {
                alternatives.push(rhs.clone());
            }
        }

        let grammar = Self {
            start: start.to_string(),
            rules,
        };
        grammar.validate()?;
        Ok(grammar)
    }

    fn validate(&self) -> Result<(), GrammarError> {
        if !self.rules.contains_key(&self.start) {
            return Err(GrammarError::MissingStart(self.start.clone()));
        }
        for (lhs, alternatives) in &self.rules {
            for symbol in alternatives.iter().flatten() {
                if let Symbol::NonTerminal(name) = symbol {
                    if !self.rules.contains_key(name) {
                        return Err(GrammarError::UndefinedSymbol {
                            symbol: name.clone(),
                            rule: lhs.clone(),
                        });
                    }
                }
            }
        }

        let mut visits = HashMap::new();
        for lhs in self.rules.keys() {
            self.check_acyclic(lhs, &mut visits)?;
        }
        Ok(())
    }

    fn check_acyclic<'a>(
        &'a self,
        symbol: &'a str,
        visits: &mut HashMap<&'a str, Visit>,
    ) -> Result<(), GrammarError> {
        match visits.get(symbol) {
            Some(Visit::Done) => return Ok(()),
            Some(Visit::InProgress) => return Err(GrammarError::Cycle(symbol.to_string())),
            None => {}
        }
        visits.insert(symbol, Visit::InProgress);
        for next in self.rules.get(symbol).into_iter().flatten().flatten() {
            if let Symbol::NonTerminal(name) = next {
                self.check_acyclic(name, visits)?;
            }
        }
        visits.insert(symbol, Visit::Done);
        Ok(())
    }

    /// Every distinct sentence derivable from the start symbol, sorted.
    pub fn sentences(&self) -> Vec<String> {
        let mut sentences: Vec<String> = self
            .expand(&self.start)
            .iter()
            .map(|tokens| join(tokens))
            .collect();
        sentences.sort();
        sentences.dedup();
        sentences
    }

    /// One sentence chosen uniformly from [`Grammar::sentences`].
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<String> {
        self.sentences().choose(rng).cloned()
    }

    fn expand(&self, symbol: &str) -> Vec<Vec<&str>> {
        let mut derivations = Vec::new();
        for alternative in self.rules.get(symbol).into_iter().flatten() {
            let mut partial: Vec<Vec<&str>> = vec![Vec::new()];
            for sym in alternative {
                partial = match sym {
                    Symbol::Terminal(text) => partial
                        .into_iter()
                        .map(|mut tokens| {
                            tokens.push(text.as_str());
                            tokens
                        })
                        .collect(),
                    Symbol::NonTerminal(name) => {
                        let tails = self.expand(name);
                        partial
                            .iter()
                            .flat_map(|head| {
                                tails.iter().map(move |tail| {
                                    let mut tokens = head.clone();
                                    tokens.extend_from_slice(tail);
                                    tokens
                                })
                            })
                            .collect()
                    }
                };
            }
            derivations.extend(partial);
        }
        derivations
    }
}

/// Space-join tokens, attaching punctuation to the preceding word.
fn join(tokens: &[&str]) -> String {
    let mut out = String::new();
    for token in tokens.iter().filter(|tok| !tok.is_empty()) {
        let attach = matches!(*token, "." | "," | "!" | "?");
        if !out.is_empty() && !attach {
            out.push(' ');
        }
        out.push_str(token);
    }
    out
}
