//! Command-line front end for one hook invocation.
//!
//! The proxy runs `capture-runner {request|response} <FILE>` once per
//! captured message. Logs go to stderr; the only output the proxy reads is
//! the callback file next to `FILE`.

use std::path::PathBuf;

use anyhow::Context as _;
use capture_core::{Addon, ExchangeConfig, Outcome, Phase};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub mod addons;

const DEFAULT_FILTER: &str = "capture=info";

#[derive(Debug, Parser)]
#[command(
    name = "capture-runner",
    about = "Run capture hooks against one proxied HTTP message",
    version
)]
pub struct Cli {
    /// Which hook to run: request or response
    pub phase: Phase,

    /// JSON document written by the proxy
    pub file: PathBuf,

    /// Directory for binary body files (default: current directory)
    #[arg(long, env = "CAPTURE_TEMP_DIR")]
    pub temp_dir: Option<PathBuf>,
}

impl Cli {
    pub fn config(&self) -> ExchangeConfig {
        match &self.temp_dir {
            Some(dir) => ExchangeConfig::default().with_temp_dir(dir),
            None => ExchangeConfig::default(),
        }
    }
}

/// Install the stderr subscriber. `RUST_LOG` replaces the default filter.
pub fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}

/// Run `addon` for the message named on the command line.
pub fn execute<A: Addon + ?Sized>(cli: &Cli, addon: &mut A) -> anyhow::Result<Outcome> {
    let outcome = capture_core::run(addon, cli.phase, &cli.file, &cli.config())
        .with_context(|| format!("{} hook on {}", cli.phase, cli.file.display()))?;
    match &outcome {
        Outcome::Written(path) => info!(phase = %cli.phase, callback = %path.display(), "done"),
        Outcome::Skipped => info!(phase = %cli.phase, "done, nothing to report"),
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addons::Addons;
    use std::fs;

    #[test]
    fn parses_phase_and_file() {
        let cli = Cli::try_parse_from(["capture-runner", "response", "/tmp/doc.json"]).unwrap();
        assert_eq!(cli.phase, Phase::Response);
        assert_eq!(cli.file, PathBuf::from("/tmp/doc.json"));
    }

    #[test]
    fn rejects_unknown_phase() {
        let err = Cli::try_parse_from(["capture-runner", "upload", "/tmp/doc.json"]).unwrap_err();
        assert!(err.to_string().contains("upload"));
    }

    #[test]
    fn rejects_wrong_argument_count() {
        assert!(Cli::try_parse_from(["capture-runner", "request"]).is_err());
        assert!(Cli::try_parse_from(["capture-runner", "request", "a.json", "b.json"]).is_err());
    }

    #[test]
    fn temp_dir_flag_reaches_config() {
        let cli = Cli::try_parse_from([
            "capture-runner",
            "request",
            "doc.json",
            "--temp-dir",
            "/var/spill",
        ])
        .unwrap();
        assert_eq!(cli.config().temp_dir, Some(PathBuf::from("/var/spill")));
        assert_eq!(cli.config().callback_suffix, ".cb");
    }

    #[test]
    fn execute_writes_callback_with_template_addons() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("request.json");
        let document = serde_json::json!({
            "context": {
                "url": "https://example.com/",
                "scheme": "https",
                "host": "example.com",
                "port": 443,
                "cid": 1,
                "ctime": 2,
                "sid": 3,
                "stime": 4
            },
            "request": {
                "method": "GET",
                "path": "/?a=1",
                "protocol": "HTTP/1.1",
                "headers": ["host: example.com"],
                "body": {"type": 0, "payload": null},
                "trailers": []
            }
        });
        fs::write(&file, document.to_string()).unwrap();

        let cli = Cli {
            phase: Phase::Request,
            file: file.clone(),
            temp_dir: Some(dir.path().to_path_buf()),
        };
        let outcome = execute(&cli, &mut Addons).unwrap();
        let Outcome::Written(path) = outcome else {
            panic!("expected a callback file");
        };
        let callback: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(callback["request"], document["request"]);
    }

    #[test]
    fn execute_names_the_failing_file() {
        let cli = Cli {
            phase: Phase::Request,
            file: PathBuf::from("/nonexistent/request.json"),
            temp_dir: None,
        };
        let err = execute(&cli, &mut Addons).unwrap_err();
        assert!(format!("{err:#}").starts_with("request hook on /nonexistent/request.json"));
    }
}
