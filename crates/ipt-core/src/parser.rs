// Line classifier for iptables-save dumps
use crate::error::ParseError;
use crate::model::{Chain, Counters, Ruleset, Table};
use crate::tokenizer::parse_rule;
use tracing::{debug, trace};

/// Position of the classifier within the dump.
///
/// Both fields persist across lines until reassigned. A table header does not
/// clear `chain`.
#[derive(Debug, Default)]
struct ParseState {
    table: Option<String>,
    chain: Option<String>,
}

/// Build a ruleset from the full text of an `iptables-save` dump.
///
/// Lines are classified by prefix: `*table`, `:chain policy [counters]`,
/// `-A chain ...`. Everything else (comments, `COMMIT`, blanks) is skipped, as
/// are `-A` lines seen before both a table and a chain header.
pub fn parse_ruleset(text: &str) -> Result<Ruleset, ParseError> {
    let mut ruleset = Ruleset::new();
    let mut state = ParseState::default();

    for (idx, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        state = classify_line(&mut ruleset, state, idx + 1, line)?;
    }

    debug!(
        tables = ruleset.tables.len(),
        rules = ruleset.rule_count(),
        "parsed ruleset"
    );
    Ok(ruleset)
}

fn classify_line(
    ruleset: &mut Ruleset,
    state: ParseState,
    line_no: usize,
    line: &str,
) -> Result<ParseState, ParseError> {
    if let Some(name) = line.strip_prefix('*') {
        debug!(table = name, line = line_no, "table header");
        ruleset.insert_table(Table::new(name));
        return Ok(ParseState {
            table: Some(name.to_string()),
            chain: state.chain,
        });
    }

    if let Some(rest) = line.strip_prefix(':') {
        let chain = chain_header(ruleset, &state, line_no, line, rest)?;
        return Ok(ParseState {
            table: state.table,
            chain: Some(chain),
        });
    }

    if line.starts_with("-A") {
        if let (Some(table), Some(_)) = (&state.table, &state.chain) {
            append_rule(ruleset, table, line_no, line)?;
        } else {
            trace!(line = line_no, "rule outside table/chain context, skipping");
        }
    }

    Ok(state)
}

fn chain_header(
    ruleset: &mut Ruleset,
    state: &ParseState,
    line_no: usize,
    line: &str,
    rest: &str,
) -> Result<String, ParseError> {
    let table = state
        .table
        .as_deref()
        .and_then(|name| ruleset.table_mut(name))
        .ok_or_else(|| ParseError::ChainWithoutTable {
            line: line_no,
            text: line.to_string(),
        })?;

    let mut parts = rest.split_whitespace();
    let (Some(name), Some(policy)) = (parts.next(), parts.next()) else {
        return Err(ParseError::MalformedChain {
            line: line_no,
            text: line.to_string(),
        });
    };
    let counters = parts.next().and_then(Counters::parse);

    debug!(table = %table.name, chain = name, policy, "chain header");
    table.insert_chain(Chain::new(name, policy).with_counters(counters));
    Ok(name.to_string())
}

fn append_rule(
    ruleset: &mut Ruleset,
    table_name: &str,
    line_no: usize,
    line: &str,
) -> Result<(), ParseError> {
    let parsed = parse_rule(line).map_err(|source| ParseError::MalformedRule {
        line: line_no,
        text: line.to_string(),
        source,
    })?;

    let chain = ruleset
        .table_mut(table_name)
        .and_then(|table| table.chain_mut(&parsed.chain))
        .ok_or_else(|| ParseError::UnknownChain {
            line: line_no,
            table: table_name.to_string(),
            chain: parsed.chain.clone(),
        })?;

    trace!(chain = %chain.name, line = line_no, "rule");
    chain.rules.push(parsed.rule);
    Ok(())
}
