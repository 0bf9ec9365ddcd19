/// Errors raised while building a ruleset from a dump.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: chain header before any table header: {text}")]
    ChainWithoutTable { line: usize, text: String },

    #[error("line {line}: chain header needs a name and a policy: {text}")]
    MalformedChain { line: usize, text: String },

    #[error("line {line}: rule appends to chain {chain} which is not declared in table {table}")]
    UnknownChain {
        line: usize,
        table: String,
        chain: String,
    },

    #[error("line {line}: malformed rule: {text}")]
    MalformedRule {
        line: usize,
        text: String,
        #[source]
        source: RuleError,
    },
}

/// Errors raised while tokenizing a single `-A` line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("option {option} is the last token")]
    DanglingOption { option: String },

    #[error("-j has no target")]
    MissingJumpTarget,

    #[error("-A has no chain name")]
    MissingChain,

    #[error("unbalanced quotes")]
    UnbalancedQuotes,
}

impl ParseError {
    /// 1-based line number the error was raised on.
    pub fn line(&self) -> usize {
        match self {
            Self::ChainWithoutTable { line, .. }
            | Self::MalformedChain { line, .. }
            | Self::UnknownChain { line, .. }
            | Self::MalformedRule { line, .. } => *line,
        }
    }
}
