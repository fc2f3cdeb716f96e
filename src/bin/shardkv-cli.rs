//! shardkv CLI client
//!
//! Interactive command-line client for shardkv, talking HTTP/JSON.

use std::io::{self, Write};

use clap::Parser;
use serde_json::Value as JsonValue;
use shardkv::config::derive_token;

/// shardkv CLI - interactive client
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Server base URL
    #[arg(short = 'H', long, default_value = "http://127.0.0.1:8081")]
    host: String,

    /// Auth login
    #[arg(long, default_value = "")]
    login: String,

    /// Auth password
    #[arg(long, default_value = "")]
    password: String,
}

enum Command {
    Set { key: String, value: String, ttl: Option<i64> },
    Get { key: String },
    GetBy { key: String, selector: String },
    Remove { key: String },
    Keys { pattern: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let token = derive_token(&args.login, &args.password);
    let client = reqwest::Client::new();

    println!("Connected to shardkv at {}", args.host);
    println!("Type 'help' for available commands, 'quit' to exit.\n");

    loop {
        print!("shardkv> ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();

        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit") {
            println!("Goodbye!");
            break;
        }
        if input.eq_ignore_ascii_case("help") {
            print_help();
            continue;
        }

        match parse_command(input) {
            Ok(cmd) => {
                if let Err(e) = run_command(&client, &args.host, &token, cmd).await {
                    eprintln!("Error: {}", e);
                }
            }
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    Ok(())
}

fn parse_command(input: &str) -> anyhow::Result<Command> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    if parts.is_empty() {
        anyhow::bail!("empty command");
    }

    match parts[0].to_lowercase().as_str() {
        "set" => {
            if parts.len() < 3 {
                anyhow::bail!("set requires key and value: set <key> <value> [ttl]");
            }
            let ttl = if parts.len() > 3 {
                Some(parts[3].parse::<i64>()?)
            } else {
                None
            };
            Ok(Command::Set {
                key: parts[1].to_string(),
                value: parts[2].to_string(),
                ttl,
            })
        }
        "get" => {
            if parts.len() < 2 {
                anyhow::bail!("get requires a key: get <key>");
            }
            Ok(Command::Get { key: parts[1].to_string() })
        }
        "getby" => {
            if parts.len() < 3 {
                anyhow::bail!("getby requires key and selector: getby <key> <selector>");
            }
            Ok(Command::GetBy {
                key: parts[1].to_string(),
                selector: parts[2].to_string(),
            })
        }
        "remove" => {
            if parts.len() < 2 {
                anyhow::bail!("remove requires a key: remove <key>");
            }
            Ok(Command::Remove { key: parts[1].to_string() })
        }
        "keys" => {
            if parts.len() < 2 {
                anyhow::bail!("keys requires a pattern: keys <pattern>");
            }
            Ok(Command::Keys { pattern: parts[1].to_string() })
        }
        other => anyhow::bail!("unknown command: {}. Type 'help' for available commands.", other),
    }
}

async fn run_command(
    client: &reqwest::Client,
    host: &str,
    token: &str,
    cmd: Command,
) -> anyhow::Result<()> {
    match cmd {
        Command::Set { key, value, ttl } => {
            let body = serde_json::json!({
                "key": key,
                "value": value,
                "ttl": ttl,
            });
            let resp = client
                .post(format!("{host}/api/v1/set"))
                .header("token", token)
                .json(&body)
                .send()
                .await?;
            print_response(resp).await
        }
        Command::Get { key } => {
            let resp = client
                .get(format!("{host}/api/v1/get/{key}"))
                .header("token", token)
                .send()
                .await?;
            print_response(resp).await
        }
        Command::GetBy { key, selector } => {
            let resp = client
                .get(format!("{host}/api/v1/getby/{key}"))
                .query(&[("index", selector)])
                .header("token", token)
                .send()
                .await?;
            print_response(resp).await
        }
        Command::Remove { key } => {
            let resp = client
                .delete(format!("{host}/api/v1/remove/{key}"))
                .header("token", token)
                .send()
                .await?;
            print_response(resp).await
        }
        Command::Keys { pattern } => {
            let resp = client
                .get(format!("{host}/api/v1/keys/{pattern}"))
                .header("token", token)
                .send()
                .await?;
            print_response(resp).await
        }
    }
}

async fn print_response(resp: reqwest::Response) -> anyhow::Result<()> {
    let status = resp.status();
    let text = resp.text().await?;
    if let Ok(parsed) = serde_json::from_str::<JsonValue>(&text) {
        println!("{} {}", status, parsed);
    } else {
        println!("{} {}", status, text);
    }
    Ok(())
}

fn print_help() {
    println!(
        r#"
Available commands:

  set <key> <value> [ttl]   - Set key to value, with optional TTL in ticks
  get <key>                 - Get value for key
  getby <key> <selector>    - Select a sequence index or mapping key inside a value
  remove <key>              - Remove a key
  keys <pattern>            - List keys matching a glob pattern

  help                      - Show this help
  quit / exit               - Exit the CLI
"#
    );
}
