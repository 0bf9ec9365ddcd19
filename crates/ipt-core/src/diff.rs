use crate::model::Ruleset;
use similar::{Algorithm, TextDiff};

/// Lines of unchanged context around each hunk.
const CONTEXT_LINES: usize = 3;

/// Structural comparison of two rulesets.
///
/// When they differ, `diff` holds a unified diff of their pretty-printed JSON,
/// with `---`/`+++` headers and `@@` hunk ranges.
#[derive(Debug, Clone)]
pub struct RulesetDiff {
    pub matches: bool,
    pub diff: Option<String>,
}

impl RulesetDiff {
    pub fn between(old: &Ruleset, new: &Ruleset) -> serde_json::Result<Self> {
        Self::between_labeled(old, new, "old", "new")
    }

    /// Same as [`RulesetDiff::between`], naming each side in the diff headers.
    pub fn between_labeled(
        old: &Ruleset,
        new: &Ruleset,
        old_label: &str,
        new_label: &str,
    ) -> serde_json::Result<Self> {
        if old == new {
            return Ok(Self {
                matches: true,
                diff: None,
            });
        }

        let old_json = serde_json::to_string_pretty(old)? + "\n";
        let new_json = serde_json::to_string_pretty(new)? + "\n";

        Ok(Self {
            matches: false,
            diff: Some(unified_diff(&old_json, &new_json, old_label, new_label)),
        })
    }
}

fn unified_diff(old: &str, new: &str, old_label: &str, new_label: &str) -> String {
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Patience)
        .diff_lines(old, new);

    diff.unified_diff()
        .context_radius(CONTEXT_LINES)
        .header(old_label, new_label)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_ruleset;

    const BASE: &str = "*filter\n:INPUT ACCEPT [0:0]\n-A INPUT -p tcp --dport 22 -j ACCEPT\nCOMMIT\n";

    #[test]
    fn identical_rulesets_match() {
        let a = parse_ruleset(BASE).unwrap();
        let b = parse_ruleset(BASE).unwrap();
        let diff = RulesetDiff::between(&a, &b).unwrap();
        assert!(diff.matches);
        assert!(diff.diff.is_none());
    }

    #[test]
    fn changed_port_shows_in_diff() {
        let a = parse_ruleset(BASE).unwrap();
        let b = parse_ruleset(&BASE.replace("22", "2222")).unwrap();
        let diff = RulesetDiff::between(&a, &b).unwrap();

        assert!(!diff.matches);
        let text = diff.diff.expect("diff text");
        assert!(text.lines().any(|l| l.starts_with('-') && l.contains("\"22\"")));
        assert!(text.lines().any(|l| l.starts_with('+') && l.contains("\"2222\"")));
    }

    #[test]
    fn diff_is_unified_with_headers_and_hunks() {
        let a = parse_ruleset(BASE).unwrap();
        let b = parse_ruleset(&BASE.replace("22", "2222")).unwrap();
        let text = RulesetDiff::between_labeled(&a, &b, "before.rules", "after.rules")
            .unwrap()
            .diff
            .unwrap();

        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("--- before.rules"));
        assert_eq!(lines.next(), Some("+++ after.rules"));
        assert!(lines.next().is_some_and(|l| l.starts_with("@@ -")));

        // Only the changed region and its context are printed.
        assert!(!text.contains("\"tables\""));
        assert!(!text.contains("No newline"));
    }
}
