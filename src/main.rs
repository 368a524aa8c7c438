use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use vitals_install::install::{self, InstallRequest};
use vitals_install::platform::Platform;
use vitals_install::resolver::DEFAULT_BASE_URL;

/// vitals-install - installer for the vitals binary
///
/// Resolves the release artifact for this machine, downloads it, verifies
/// its SHA-256 against the release checksum manifest, and installs it
/// atomically into a bin directory.
///
/// Examples:
///   vitals-install install 0.1.0     # Install release v0.1.0
///   vitals-install resolve 0.1.0     # Show the artifact URL and checksum
#[derive(Parser, Debug)]
#[command(author, version = env!("VITALS_INSTALL_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Install directory (defaults to ~/.local/bin; also via VITALS_BIN_DIR)
    #[arg(
        long = "bin-dir",
        short = 'b',
        env = "VITALS_BIN_DIR",
        value_name = "PATH",
        global = true
    )]
    pub bin_dir: Option<PathBuf>,

    /// Checksum manifest file (also via VITALS_MANIFEST)
    #[arg(
        long = "manifest",
        short = 'm',
        env = "VITALS_MANIFEST",
        value_name = "PATH",
        global = true
    )]
    pub manifest: Option<PathBuf>,

    /// Release host base URL
    #[arg(long = "base-url", value_name = "URL", default_value = DEFAULT_BASE_URL, global = true)]
    pub base_url: String,

    /// Platform tag override, e.g. linux-arm64 (defaults to the host)
    #[arg(long = "platform", value_name = "TAG", global = true)]
    pub platform: Option<Platform>,

    /// Download timeout in seconds
    #[arg(long = "timeout-secs", value_name = "SECS", default_value_t = 30, global = true)]
    pub timeout_secs: u64,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Download, verify, and install a release
    Install(InstallArgs),

    /// Print the resolved artifact URL and checksum without installing
    Resolve(ResolveArgs),
}

#[derive(clap::Args, Debug)]
pub struct InstallArgs {
    /// The release version, e.g. "0.1.0" or "v0.1.0"
    #[arg(value_name = "VERSION")]
    pub version: String,

    /// Skip the post-install smoke test
    #[arg(long = "skip-smoke")]
    pub skip_smoke: bool,
}

#[derive(clap::Args, Debug)]
pub struct ResolveArgs {
    /// The release version, e.g. "0.1.0" or "v0.1.0"
    #[arg(value_name = "VERSION")]
    pub version: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = vitals_install::runtime::RealRuntime;

    match cli.command {
        Commands::Install(args) => {
            let request = InstallRequest {
                version: args.version,
                platform: cli.platform,
                bin_dir: cli.bin_dir,
                manifest: cli.manifest,
                base_url: cli.base_url,
                skip_smoke: args.skip_smoke,
            };
            let report = install::install(runtime, request, cli.timeout_secs).await?;
            if let Some(Err(e)) = report.smoke {
                // Installed but possibly broken; not a failed install.
                eprintln!("warning: {}", e);
            }
        }
        Commands::Resolve(args) => {
            let request = InstallRequest {
                version: args.version,
                platform: cli.platform,
                bin_dir: cli.bin_dir,
                manifest: cli.manifest,
                base_url: cli.base_url,
                skip_smoke: true,
            };
            install::resolve_artifact(runtime, &request)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_install_parsing() {
        let cli = Cli::try_parse_from(["vitals-install", "install", "0.1.0"]).unwrap();
        match cli.command {
            Commands::Install(args) => {
                assert_eq!(args.version, "0.1.0");
                assert!(!args.skip_smoke);
            }
            _ => panic!("Expected Install command"),
        }
        assert_eq!(cli.bin_dir, None);
        assert_eq!(cli.base_url, DEFAULT_BASE_URL);
        assert_eq!(cli.timeout_secs, 30);
    }

    #[test]
    fn test_cli_resolve_parsing() {
        let cli = Cli::try_parse_from(["vitals-install", "resolve", "v0.2.1"]).unwrap();
        match cli.command {
            Commands::Resolve(args) => assert_eq!(args.version, "v0.2.1"),
            _ => panic!("Expected Resolve command"),
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::try_parse_from([
            "vitals-install",
            "--bin-dir",
            "/tmp/bin",
            "--platform",
            "linux-arm64",
            "install",
            "0.1.0",
            "--skip-smoke",
        ])
        .unwrap();

        assert_eq!(cli.bin_dir, Some(PathBuf::from("/tmp/bin")));
        assert_eq!(cli.platform.unwrap().tag(), "linux-arm64");
        match cli.command {
            Commands::Install(args) => assert!(args.skip_smoke),
            _ => panic!("Expected Install command"),
        }
    }

    #[test]
    fn test_cli_rejects_bad_platform_tag() {
        let result =
            Cli::try_parse_from(["vitals-install", "--platform", "windows-amd64", "install", "0.1.0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_no_subcommand_fails() {
        let result = Cli::try_parse_from(["vitals-install", "0.1.0"]);
        assert!(result.is_err());
    }
}
