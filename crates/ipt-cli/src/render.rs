use clap::ValueEnum;
use ipt_core::{Action, Chain, Ruleset};
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
    Text,
}

pub fn render_ruleset(ruleset: &Ruleset, format: OutputFormat) -> anyhow::Result<String> {
    let output = match format {
        OutputFormat::Json => serde_json::to_string_pretty(ruleset)? + "\n",
        OutputFormat::Yaml => serde_yaml::to_string(ruleset)?,
        OutputFormat::Text => {
            let mut out = String::new();
            for table in ruleset.tables() {
                writeln!(out, "table {}", table.name)?;
                for chain in table.chains() {
                    write_chain(&mut out, chain)?;
                }
            }
            out
        }
    };
    Ok(output)
}

pub fn render_chain(chain: &Chain, format: OutputFormat) -> anyhow::Result<String> {
    let output = match format {
        OutputFormat::Json => serde_json::to_string_pretty(chain)? + "\n",
        OutputFormat::Yaml => serde_yaml::to_string(chain)?,
        OutputFormat::Text => {
            let mut out = String::new();
            write_chain(&mut out, chain)?;
            out
        }
    };
    Ok(output)
}

fn write_chain(out: &mut String, chain: &Chain) -> std::fmt::Result {
    write!(out, "  chain {} policy {}", chain.name, chain.policy)?;
    if let Some(counters) = chain.counters {
        write!(out, " [{}:{}]", counters.packets, counters.bytes)?;
    }
    writeln!(out)?;

    for (i, rule) in chain.rules().iter().enumerate() {
        writeln!(out, "    rule {}: {}", i + 1, rule.raw)?;
        for m in &rule.matches {
            match &m.value {
                Some(value) => writeln!(out, "      match {} = {}", m.option, value)?,
                None => writeln!(out, "      match {}", m.option)?,
            }
        }
        for action in &rule.actions {
            match action {
                Action::Jump { target } => writeln!(out, "      jump {}", target)?,
                Action::Other { label } => writeln!(out, "      action {}", label)?,
            }
        }
    }
    Ok(())
}
