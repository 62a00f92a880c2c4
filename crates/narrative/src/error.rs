use thiserror::Error;

/// A composed grammar that cannot derive a finite set of sentences.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("Start symbol {0} has no rules")]
    MissingStart(String),

    #[error("Symbol {symbol} used in {rule} has no rules")]
    UndefinedSymbol { symbol: String, rule: String },

    #[error("Symbol {0} derives itself")]
    Cycle(String),
}
