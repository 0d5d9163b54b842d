mod commands;
mod config;
mod loadout;
mod range;
mod save;
mod scheduler;

use std::{
    fs::{self, OpenOptions},
    sync::Mutex,
};

use anyhow::{Context, Result};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::{
    commands::Command,
    config::AppConfig,
    loadout::Loadout,
    range::Range,
    save::SaveManager,
    scheduler::CuePlayer,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;

    let resumed = if config.resume {
        Range::resume(config.engine.clone(), SaveManager::new(&config.save_dir))?
    } else {
        None
    };
    let mut range = match resumed {
        Some(range) => range,
        None => {
            let loadout = Loadout::load_or_sample(&config.loadout)?;
            Range::new(config.engine.clone(), loadout, SaveManager::new(&config.save_dir))?
        }
    };
    if let Some(weapon) = &config.weapon {
        range.select_weapon(weapon)?;
    }

    let player = CuePlayer::new(config.realtime_cues);
    let mut stdout = io::stdout();
    let mut lines = BufReader::new(io::stdin()).lines();

    write_prompt(&mut stdout, &range).await?;
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        if line.trim().is_empty() {
            write_prompt(&mut stdout, &range).await?;
            continue;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(err) => {
                stdout.write_all(format!("! {err:#}\n").as_bytes()).await?;
                write_prompt(&mut stdout, &range).await?;
                continue;
            }
        };

        let outcome = range.execute(command)?;
        for text in &outcome.lines {
            stdout.write_all(format!("{text}\n").as_bytes()).await?;
        }
        player.play(&outcome.cues, &mut stdout).await?;
        if outcome.quit {
            break;
        }
        write_prompt(&mut stdout, &range).await?;
    }

    Ok(())
}

async fn write_prompt(stdout: &mut io::Stdout, range: &Range) -> Result<()> {
    stdout
        .write_all(format!("[{}]> ", range.weapon().id).as_bytes())
        .await?;
    stdout.flush().await?;
    Ok(())
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("armory.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    // stdout belongs to the prompt
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .compact()
        .with_ansi(false)
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}
