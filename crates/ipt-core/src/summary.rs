use crate::model::Ruleset;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesetSummary {
    pub tables: Vec<TableSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSummary {
    pub name: String,
    pub chains: Vec<ChainSummary>,
    pub rules: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSummary {
    pub name: String,
    pub policy: String,
    pub rules: usize,
    /// Distinct jump targets in first-use order.
    pub targets: Vec<String>,
}

impl RulesetSummary {
    pub fn from_ruleset(ruleset: &Ruleset) -> Self {
        let tables = ruleset
            .tables()
            .iter()
            .map(|table| TableSummary {
                name: table.name.clone(),
                rules: table.rule_count(),
                chains: table
                    .chains()
                    .iter()
                    .map(|chain| {
                        let mut targets: Vec<String> = vec![];
                        for target in chain.rules().iter().filter_map(|r| r.jump_target()) {
                            if !targets.iter().any(|t| t == target) {
                                targets.push(target.to_string());
                            }
                        }
                        ChainSummary {
                            name: chain.name.clone(),
                            policy: chain.policy.clone(),
                            rules: chain.rules().len(),
                            targets,
                        }
                    })
                    .collect(),
            })
            .collect();

        Self { tables }
    }

    pub fn total_rules(&self) -> usize {
        self.tables.iter().map(|t| t.rules).sum()
    }

    pub fn display(&self) {
        println!("📊 Ruleset Summary\n");

        if self.tables.is_empty() {
            println!("  (no tables)");
            return;
        }

        for table in &self.tables {
            println!(
                "🔥 {} - {} chains, {} rules",
                table.name,
                table.chains.len(),
                table.rules
            );
            for chain in &table.chains {
                println!("  • {} [{}] - {} rules", chain.name, chain.policy, chain.rules);
                if !chain.targets.is_empty() {
                    println!("    Targets: {}", chain.targets.join(", "));
                }
            }
        }

        println!("\nTotal: {} rules", self.total_rules());
    }
}
