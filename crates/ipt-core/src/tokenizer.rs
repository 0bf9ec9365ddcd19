// Rule line tokenizer: `-A CHAIN <option/value pairs...> -j TARGET`
use crate::error::RuleError;
use crate::model::{Action, Match, Rule};
use std::borrow::Cow;

/// A tokenized `-A` line together with the chain it appends to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleLine {
    pub chain: String,
    pub rule: Rule,
}

/// Decompose one `-A` line into ordered matches and actions.
///
/// Tokens are split with shell quoting rules, so `--comment "allow web"` keeps
/// its value as a single token. Whether an option takes a value is decided by
/// looking at the next token only: if it starts with `-` the option is a flag.
/// Values that themselves begin with `-` are therefore read as flags.
pub fn parse_rule(line: &str) -> Result<RuleLine, RuleError> {
    let tokens = shlex::split(&escape_hashes(line)).ok_or(RuleError::UnbalancedQuotes)?;
    let mut tokens = tokens.into_iter().peekable();

    // `-A CHAIN` names the chain; it is not a match.
    if tokens.next_if(|t| t == "-A").is_none() {
        return Err(RuleError::MissingChain);
    }
    let chain = tokens.next().ok_or(RuleError::MissingChain)?;

    let mut matches = Vec::new();
    let mut actions = Vec::new();

    while let Some(token) = tokens.next() {
        if token == "-j" {
            let target = tokens.next().ok_or(RuleError::MissingJumpTarget)?;
            actions.push(Action::Jump { target });
            continue;
        }

        if !token.starts_with('-') {
            // Bare keyword; a standalone `!` lands here too.
            actions.push(Action::Other { label: token });
            continue;
        }
        let option = token
            .strip_prefix("--")
            .unwrap_or(&token[1..])
            .to_string();

        let has_value = match tokens.peek() {
            Some(next) => !next.starts_with('-'),
            None => return Err(RuleError::DanglingOption { option: token }),
        };
        let value = if has_value { tokens.next() } else { None };

        matches.push(Match { option, value });
    }

    Ok(RuleLine {
        chain,
        rule: Rule {
            raw: line.to_string(),
            matches,
            actions,
        },
    })
}

/// Backslash-escape every unquoted `#`.
///
/// `shlex` starts a comment at a word beginning with `#`, but chain names,
/// jump targets and ipset names in a dump are plain words.
fn escape_hashes(line: &str) -> Cow<'_, str> {
    if !line.contains('#') {
        return Cow::Borrowed(line);
    }

    let mut out = String::with_capacity(line.len() + 4);
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for ch in line.chars() {
        if escaped {
            escaped = false;
        } else {
            match (quote, ch) {
                (None, '#') => out.push('\\'),
                (None, '\\') | (Some('"'), '\\') => escaped = true,
                (None, '\'' | '"') => quote = Some(ch),
                (Some(q), c) if c == q => quote = None,
                _ => {}
            }
        }
        out.push(ch);
    }

    Cow::Owned(out)
}
