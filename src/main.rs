use std::num::NonZeroUsize;
use std::time::Duration;

use anyhow::{Context, Result};
use log::*;
use reqwest::Url;
use structopt::StructOpt;
use tokio::io::{AsyncBufReadExt, BufReader};

use userdir::prompt::{self, Command};
use userdir::{DeleteOutcome, Directory, DirectoryConfig, DuplicatePolicy, HttpGateway, SourceConfig};

#[derive(Debug, StructOpt)]
#[structopt(name = "userdir", about = "Browse a paged directory of generated users")]
struct Opt {
    /// User source endpoint
    #[structopt(long, default_value = "https://randomuser.me/api/")]
    endpoint: Url,
    /// Records per page, at least 1
    #[structopt(long, default_value = "10")]
    batch_size: NonZeroUsize,
    /// Simulated confirmation latency of a delete, in milliseconds
    #[structopt(long, default_value = "500")]
    delete_delay_ms: u64,
    #[structopt(long, default_value = "10")]
    timeout_secs: u64,
    /// Seed passed to the source for reproducible pages
    #[structopt(long)]
    seed: Option<String>,
    /// What to do when a page repeats a cached email: keep-first or overwrite
    #[structopt(long, default_value = "keep-first", parse(try_from_str = parse_policy))]
    duplicates: DuplicatePolicy,
    /// Print the directory view as JSON after every command
    #[structopt(long)]
    json: bool,
}

fn parse_policy(s: &str) -> Result<DuplicatePolicy> {
    serde_json::from_value(serde_json::Value::String(s.to_owned()))
        .with_context(|| format!("Unknown duplicate policy '{}'", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();
    let opt = Opt::from_args();
    debug!("Options {:?}", opt);

    let source = SourceConfig {
        endpoint: opt.endpoint.clone(),
        timeout: Duration::from_secs(opt.timeout_secs),
        seed: opt.seed.clone(),
    };
    let gateway = HttpGateway::new(source).context("Error building HTTP client")?;
    let directory = Directory::new(
        gateway,
        DirectoryConfig {
            batch_size: opt.batch_size,
            delete_delay: Duration::from_millis(opt.delete_delay_ms),
            duplicates: opt.duplicates,
        },
    );

    println!("Loading users from {}", opt.endpoint);
    if let Err(e) = directory.load_initial().await {
        warn!("Initial load failed: {}", e);
    }
    show(&directory, &opt)?;

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = input.next_line().await? {
        let command = match line.parse::<Command>() {
            Ok(c) => c,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };
        match command {
            Command::Quit => break,
            Command::Help => println!("{}", prompt::HELP),
            Command::List => show(&directory, &opt)?,
            Command::Search(query) => {
                directory.set_query(query);
                show(&directory, &opt)?;
            }
            Command::More => {
                // The marker scrolls into view, then out again once the new
                // page has been rendered above it.
                if let Err(e) = directory.sentinel_visibility(true).await {
                    warn!("Loading more failed: {}", e);
                }
                show(&directory, &opt)?;
                directory.sentinel_visibility(false).await?;
            }
            Command::Refresh => {
                if let Err(e) = directory.refresh().await {
                    warn!("Refresh failed: {}", e);
                }
                show(&directory, &opt)?;
            }
            Command::Retry => {
                if let Err(e) = directory.retry().await {
                    warn!("Retry failed: {}", e);
                }
                show(&directory, &opt)?;
            }
            Command::Show(key) => match directory.find(&key) {
                Some(user) => println!("{}", prompt::render_detail(&user)),
                None => println!("No user with email {}", key),
            },
            Command::Delete(key) => {
                let user = match directory.find(&key) {
                    Some(user) => user,
                    None => {
                        println!("No user with email {}", key);
                        continue;
                    }
                };
                let question = format!("Really delete {}?", user.display_name());
                if !prompt::confirm(&mut input, &question).await? {
                    continue;
                }
                let pending = directory.delete(key);
                tokio::spawn(async move {
                    let key = pending.key().to_owned();
                    match pending.wait().await {
                        DeleteOutcome::Removed(user) => println!("Deleted {}", user.display_name()),
                        DeleteOutcome::Missing => println!("{} was already gone", key),
                        DeleteOutcome::Cancelled => println!("Delete of {} cancelled", key),
                    }
                });
            }
        }
    }
    Ok(())
}

fn show(directory: &Directory<HttpGateway>, opt: &Opt) -> Result<()> {
    let view = directory.snapshot();
    if opt.json {
        println!("{}", serde_json::to_string_pretty(&view).context("Error serialising view")?);
    } else {
        println!("{}", prompt::render_list(&view));
    }
    Ok(())
}
