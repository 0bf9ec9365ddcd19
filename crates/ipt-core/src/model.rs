use serde::{Deserialize, Serialize};

/// Parsed `iptables-save` dump: tables in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ruleset {
    pub tables: Vec<Table>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub chains: Vec<Chain>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    pub name: String,
    /// Built-in chains carry a verdict (`ACCEPT`, `DROP`); user chains carry `-`.
    pub policy: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counters: Option<Counters>,
    pub rules: Vec<Rule>,
}

/// `[packets:bytes]` from a chain header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub packets: u64,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// The rule line as it appeared in the dump.
    pub raw: String,
    pub matches: Vec<Match>,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub option: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    Jump { target: String },
    Other { label: String },
}

impl Ruleset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn rule_count(&self) -> usize {
        self.tables.iter().map(Table::rule_count).sum()
    }

    pub(crate) fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.name == name)
    }

    /// Insert a fresh table. A repeated header replaces the earlier table but
    /// keeps its position.
    pub(crate) fn insert_table(&mut self, table: Table) {
        match self.table_mut(&table.name) {
            Some(existing) => *existing = table,
            None => self.tables.push(table),
        }
    }
}

impl Table {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            chains: vec![],
        }
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    pub fn chain(&self, name: &str) -> Option<&Chain> {
        self.chains.iter().find(|c| c.name == name)
    }

    pub fn rule_count(&self) -> usize {
        self.chains.iter().map(|c| c.rules.len()).sum()
    }

    pub(crate) fn chain_mut(&mut self, name: &str) -> Option<&mut Chain> {
        self.chains.iter_mut().find(|c| c.name == name)
    }

    pub(crate) fn insert_chain(&mut self, chain: Chain) {
        match self.chain_mut(&chain.name) {
            Some(existing) => *existing = chain,
            None => self.chains.push(chain),
        }
    }
}

impl Chain {
    pub fn new(name: &str, policy: &str) -> Self {
        Self {
            name: name.to_string(),
            policy: policy.to_string(),
            counters: None,
            rules: vec![],
        }
    }

    pub fn with_counters(mut self, counters: Option<Counters>) -> Self {
        self.counters = counters;
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// User-defined chains have no default policy.
    pub fn is_builtin(&self) -> bool {
        self.policy != "-"
    }
}

impl Counters {
    /// Parse the `[packets:bytes]` token of a chain header.
    pub fn parse(token: &str) -> Option<Self> {
        let inner = token.strip_prefix('[')?.strip_suffix(']')?;
        let (packets, bytes) = inner.split_once(':')?;
        Some(Self {
            packets: packets.parse().ok()?,
            bytes: bytes.parse().ok()?,
        })
    }
}

impl Rule {
    /// Target of the first `-j` action, if any.
    pub fn jump_target(&self) -> Option<&str> {
        self.actions.iter().find_map(|action| match action {
            Action::Jump { target } => Some(target.as_str()),
            Action::Other { .. } => None,
        })
    }

    /// Value of the first match with this option name. Flags yield `Some(None)`.
    pub fn match_value(&self, option: &str) -> Option<Option<&str>> {
        self.matches
            .iter()
            .find(|m| m.option == option)
            .map(|m| m.value.as_deref())
    }
}

impl Match {
    pub fn new(option: &str, value: Option<&str>) -> Self {
        Self {
            option: option.to_string(),
            value: value.map(str::to_string),
        }
    }
}

impl Action {
    pub fn jump(target: &str) -> Self {
        Self::Jump {
            target: target.to_string(),
        }
    }

    pub fn other(label: &str) -> Self {
        Self::Other {
            label: label.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_parse_bracketed_pair() {
        assert_eq!(
            Counters::parse("[12:3400]"),
            Some(Counters {
                packets: 12,
                bytes: 3400
            })
        );
        assert_eq!(Counters::parse("0:0"), None);
        assert_eq!(Counters::parse("[x:0]"), None);
        assert_eq!(Counters::parse("[1]"), None);
    }

    #[test]
    fn repeated_table_header_replaces_in_place() {
        let mut ruleset = Ruleset::new();
        let mut filter = Table::new("filter");
        filter.insert_chain(Chain::new("INPUT", "ACCEPT"));
        ruleset.insert_table(filter);
        ruleset.insert_table(Table::new("nat"));
        ruleset.insert_table(Table::new("filter"));

        let names: Vec<_> = ruleset.tables().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["filter", "nat"]);
        assert!(ruleset.table("filter").unwrap().chains().is_empty());
    }

    #[test]
    fn action_serializes_with_type_tag() {
        let json = serde_json::to_value(Action::jump("ACCEPT")).unwrap();
        assert_eq!(json["type"], "jump");
        assert_eq!(json["target"], "ACCEPT");

        let json = serde_json::to_value(Action::other("!")).unwrap();
        assert_eq!(json["type"], "other");
        assert_eq!(json["label"], "!");
    }

    #[test]
    fn rule_queries() {
        let rule = Rule {
            raw: "-A INPUT -p tcp --syn -j DROP".into(),
            matches: vec![Match::new("p", Some("tcp")), Match::new("syn", None)],
            actions: vec![Action::jump("DROP")],
        };

        assert_eq!(rule.jump_target(), Some("DROP"));
        assert_eq!(rule.match_value("p"), Some(Some("tcp")));
        assert_eq!(rule.match_value("syn"), Some(None));
        assert_eq!(rule.match_value("dport"), None);
    }
}
