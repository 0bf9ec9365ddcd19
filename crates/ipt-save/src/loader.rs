use anyhow::{Context, Result};
use ipt_core::{Ruleset, parse_ruleset};
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// File the loader reads when no path is given.
pub const DEFAULT_DUMP_FILE: &str = "iptables.rules";

/// Reads saved dumps from disk or stdin.
pub struct DumpLoader;

impl DumpLoader {
    pub fn new() -> Self {
        Self
    }

    /// Read a dump as text. `-` reads stdin.
    pub fn read_dump(&self, path: &Path) -> Result<String> {
        if path == Path::new("-") {
            return self
                .read_from(std::io::stdin().lock())
                .context("Failed to read dump from stdin");
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dump from {:?}", path))?;
        debug!(path = %path.display(), bytes = content.len(), "read dump");
        Ok(content)
    }

    /// Read a whole dump from any reader, such as a pipe.
    pub fn read_from<R: Read>(&self, mut reader: R) -> Result<String> {
        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .context("Failed to read dump text")?;
        debug!(bytes = content.len(), "read dump from stream");
        Ok(content)
    }

    /// Read and parse a dump.
    pub fn load_ruleset(&self, path: &Path) -> Result<Ruleset> {
        let content = self.read_dump(path)?;
        let ruleset = parse_ruleset(&content)
            .with_context(|| format!("Failed to parse dump {:?}", path))?;
        Ok(ruleset)
    }

    pub fn load_default_ruleset(&self) -> Result<Ruleset> {
        self.load_ruleset(Path::new(DEFAULT_DUMP_FILE))
    }
}

impl Default for DumpLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipt_core::ParseError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn dump_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write dump");
        file
    }

    #[test]
    fn loads_ruleset_from_file() {
        let file = dump_file("*filter\n:INPUT ACCEPT [0:0]\n-A INPUT -j ACCEPT\nCOMMIT\n");
        let ruleset = DumpLoader::new().load_ruleset(file.path()).unwrap();

        let input = ruleset.table("filter").unwrap().chain("INPUT").unwrap();
        assert_eq!(input.rules().len(), 1);
    }

    #[test]
    fn reads_dump_from_stream() {
        let loader = DumpLoader::new();
        let stream: &[u8] = b"*nat\n:PREROUTING ACCEPT [0:0]\n-A PREROUTING -p tcp -j REDIRECT\nCOMMIT\n";

        let content = loader.read_from(stream).unwrap();
        let ruleset = parse_ruleset(&content).unwrap();
        let prerouting = ruleset.table("nat").unwrap().chain("PREROUTING").unwrap();
        assert_eq!(prerouting.rules()[0].jump_target(), Some("REDIRECT"));
    }

    #[test]
    fn non_utf8_stream_is_an_error() {
        let stream: &[u8] = &[0x2a, 0xff, 0xfe, 0x0a];
        assert!(DumpLoader::new().read_from(stream).is_err());
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = DumpLoader::new()
            .load_ruleset(Path::new("/nonexistent/iptables.rules"))
            .unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/iptables.rules"));
    }

    #[test]
    fn parse_errors_keep_their_type() {
        let file = dump_file(":INPUT ACCEPT [0:0]\n");
        let err = DumpLoader::new().load_ruleset(file.path()).unwrap_err();

        match err.downcast_ref::<ParseError>() {
            Some(ParseError::ChainWithoutTable { line, .. }) => assert_eq!(*line, 1),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
