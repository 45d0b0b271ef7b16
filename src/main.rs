use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct CliArgs {
    backend: Option<String>,
    config_dir: Option<PathBuf>,
    offline: bool,
}

fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1).collect())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("streamly=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    streamly::app::run(streamly::app::AppOptions {
        backend_url: args.backend,
        config_dir: args.config_dir,
        offline: args.offline,
    })
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--offline" => out.offline = true,
            "--backend" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--backend requires a URL");
                };
                if value.trim().is_empty() {
                    anyhow::bail!("--backend cannot be empty");
                }
                out.backend = Some(value.trim().to_string());
            }
            "--config-dir" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--config-dir requires a directory");
                };
                out.config_dir = Some(PathBuf::from(value));
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument {other}"),
        }
        index += 1;
    }
    Ok(out)
}

fn print_help() {
    println!("streamly");
    println!("  --backend URL       Streamly backend (default http://localhost:3000)");
    println!("  --config-dir DIR    Settings and playlists directory");
    println!("  --offline           Use the built-in demo catalog instead of a backend");
    println!();
    println!("Set RUST_LOG to change log output (default streamly=info).");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_all_flags() {
        let parsed = parse_args(args(&["--backend", "http://h:1", "--config-dir", "/tmp/s", "--offline"]))
            .expect("parse");
        assert_eq!(parsed.backend.as_deref(), Some("http://h:1"));
        assert_eq!(parsed.config_dir, Some(PathBuf::from("/tmp/s")));
        assert!(parsed.offline);
    }

    #[test]
    fn rejects_unknown_and_incomplete_flags() {
        assert!(parse_args(args(&["--nope"])).is_err());
        assert!(parse_args(args(&["--backend"])).is_err());
        assert!(parse_args(args(&["--backend", " "])).is_err());
    }
}
