//! tagkv - command-line access to an S3-backed key store.
//!
//! Parses options and a single command, runs it against the bucket, prints
//! the result.

use std::sync::Arc;
use std::time::Duration;
use tagkv::backend::S3Backend;
use tagkv::{Client, Options};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// A parsed command.
#[derive(Debug)]
enum Command {
    Ping,
    Get(String),
    Set { key: String, value: String, ttl: u64 },
    Del(String),
    Lock(String),
    Unlock(String),
    Meta(String),
}

/// Command-line configuration
#[derive(Debug)]
struct Config {
    options: Options,
    command: Command,
}

/// Why argument parsing stopped without a configuration.
#[derive(Debug, PartialEq)]
enum Exit {
    Help,
    Version,
    Usage(String),
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let args: Vec<String> = std::env::args().skip(1).collect();

        match Self::parse(&args) {
            Ok(config) => config,
            Err(Exit::Help) => {
                print_help();
                std::process::exit(0);
            }
            Err(Exit::Version) => {
                println!("tagkv version {}", tagkv::VERSION);
                std::process::exit(0);
            }
            Err(Exit::Usage(message)) => {
                eprintln!("Error: {}", message);
                print_help();
                std::process::exit(1);
            }
        }
    }

    fn parse(args: &[String]) -> Result<Self, Exit> {
        let mut options = Options::default();
        let mut rest = Vec::new();

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--bucket" | "-b" => {
                    options.bucket = value_of(args, i, "--bucket")?;
                    i += 2;
                }
                "--region" | "-r" => {
                    options.region = value_of(args, i, "--region")?;
                    i += 2;
                }
                "--endpoint" | "-e" => {
                    options.endpoint = Some(value_of(args, i, "--endpoint")?);
                    i += 2;
                }
                "--timeout" | "-t" => {
                    let secs = value_of(args, i, "--timeout")?
                        .parse()
                        .map_err(|_| Exit::Usage("invalid timeout".into()))?;
                    options.timeout = Duration::from_secs(secs);
                    i += 2;
                }
                "--auto-create" => {
                    options.auto_create_bucket = true;
                    i += 1;
                }
                "--enforce-consistency" => {
                    options.enforce_consistency = true;
                    i += 1;
                }
                "--read-only" => {
                    options.read_only = true;
                    i += 1;
                }
                "--help" | "-h" => return Err(Exit::Help),
                "--version" | "-v" => return Err(Exit::Version),
                other => {
                    rest.push(other.to_string());
                    i += 1;
                }
            }
        }

        let command =
            parse_command(&rest).ok_or_else(|| Exit::Usage("missing or invalid command".into()))?;

        Ok(Config { options, command })
    }
}

fn value_of(args: &[String], i: usize, flag: &str) -> Result<String, Exit> {
    args.get(i + 1)
        .cloned()
        .ok_or_else(|| Exit::Usage(format!("{} requires a value", flag)))
}

fn parse_command(words: &[String]) -> Option<Command> {
    let (name, args) = words.split_first()?;
    let key = || args.first().cloned();

    match (name.to_ascii_lowercase().as_str(), args.len()) {
        ("ping", 0) => Some(Command::Ping),
        ("get", 1) => Some(Command::Get(key()?)),
        ("del", 1) => Some(Command::Del(key()?)),
        ("lock", 1) => Some(Command::Lock(key()?)),
        ("unlock", 1) => Some(Command::Unlock(key()?)),
        ("meta", 1) => Some(Command::Meta(key()?)),
        ("set", 2) | ("set", 3) => Some(Command::Set {
            key: args[0].clone(),
            value: args[1].clone(),
            ttl: match args.get(2) {
                Some(ttl) => ttl.parse().ok()?,
                None => 0,
            },
        }),
        _ => None,
    }
}

fn print_help() {
    println!(
        r#"
tagkv - key-value access to an S3 bucket

USAGE:
    tagkv [OPTIONS] <COMMAND>

OPTIONS:
    -b, --bucket <BUCKET>       Bucket holding the keys (required)
    -r, --region <REGION>       Bucket region (required)
    -e, --endpoint <URL>        S3-compatible endpoint override
    -t, --timeout <SECONDS>     Per-request deadline (default: none)
        --auto-create           Create the bucket if it does not exist
        --enforce-consistency   Lock keys while modifying them
        --read-only             Reserved; accepted but not enforced yet
    -v, --version               Print version information
    -h, --help                  Print this help message

COMMANDS:
    ping                        Check the bucket is reachable
    get <key>                   Print a string value
    set <key> <value> [ttl]     Store a string value, optional TTL in seconds
    del <key>                   Delete a key
    lock <key>                  Set the advisory lock
    unlock <key>                Clear the advisory lock
    meta <key>                  Print the key's metadata

ENVIRONMENT:
    RUST_LOG                    Log filter (default: info)
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_args();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let backend = Arc::new(S3Backend::connect(&config.options).await);
    let client = Client::connect(config.options, backend).await?;
    debug!(command = ?config.command, "running");

    match config.command {
        Command::Ping => {
            client.ping().await?;
            println!("PONG");
        }
        Command::Get(key) => {
            let stored = client.get::<String>(&key).await?;
            println!("{}", stored.value);
        }
        Command::Set { key, value, ttl } => {
            client.set(&key, &value, ttl).await?;
            println!("OK");
        }
        Command::Del(key) => {
            client.del(&key).await?;
            println!("OK");
        }
        Command::Lock(key) => {
            client.lock(&key).await?;
            println!("OK");
        }
        Command::Unlock(key) => {
            client.unlock(&key).await?;
            println!("OK");
        }
        Command::Meta(key) => {
            let metadata = client.metadata(&key).await?;
            println!("ValueType:  {}", metadata.value_type);
            println!("Locked:     {}", metadata.locked);
            println!("ExpireTime: {}", metadata.expire_time);
            println!("LastUpdate: {}", metadata.last_update);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_parse_every_option() {
        let config = Config::parse(&args(
            "-b cache -r eu-west-1 -e http://localhost:9000 -t 5 \
             --auto-create --enforce-consistency --read-only set k v 60",
        ))
        .unwrap();

        let options = &config.options;
        assert_eq!(options.bucket, "cache");
        assert_eq!(options.region, "eu-west-1");
        assert_eq!(options.endpoint.as_deref(), Some("http://localhost:9000"));
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert!(options.auto_create_bucket);
        assert!(options.enforce_consistency);
        assert!(options.read_only);

        assert!(matches!(
            config.command,
            Command::Set { ref key, ref value, ttl: 60 } if key == "k" && value == "v"
        ));
    }

    #[test]
    fn test_read_only_defaults_off() {
        let config = Config::parse(&args("--bucket b --region r get k")).unwrap();
        assert!(!config.options.read_only);
        assert!(matches!(config.command, Command::Get(ref key) if key == "k"));
    }

    #[test]
    fn test_parse_failures() {
        assert_eq!(Config::parse(&args("--help")).unwrap_err(), Exit::Help);
        assert_eq!(Config::parse(&args("-v")).unwrap_err(), Exit::Version);
        assert!(matches!(
            Config::parse(&args("get k --bucket")).unwrap_err(),
            Exit::Usage(_)
        ));
        assert!(matches!(
            Config::parse(&args("-t soon get k")).unwrap_err(),
            Exit::Usage(_)
        ));
        assert!(matches!(
            Config::parse(&args("get")).unwrap_err(),
            Exit::Usage(_)
        ));
    }
}
