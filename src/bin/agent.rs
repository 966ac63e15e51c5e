//! Live commentary agents for Afrique Sports
//!
//! `replay` rebuilds a finished match from ESPN data; `audio` follows a
//! live stream and turns the broadcast into feed events.

use afcon::live::{
    AgentSession, AudioAgent, ChatClient, ContentApi, EspnClient, ReplayAgent, Transcriber,
};
use afcon::stop::StopFlag;
use afcon::{Config, Result};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "afcon-agent")]
#[command(about = "Live French commentary agents for Afrique Sports", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "afcon.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a finished match with generated commentary
    Replay {
        /// ESPN event id
        #[arg(long = "match")]
        match_id: String,
        /// Replay speed multiplier
        #[arg(long, default_value = "2.0")]
        speed: f64,
        /// Only post key events
        #[arg(long)]
        no_commentary: bool,
    },
    /// Follow a live audio stream
    Audio {
        /// ESPN event id
        #[arg(long = "match")]
        match_id: String,
        /// Stream URL
        #[arg(long)]
        url: String,
        /// Stop after this many chunks
        #[arg(long)]
        max_chunks: Option<usize>,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let config = match Config::load_or_default(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Replay {
            match_id,
            speed,
            no_commentary,
        } => commands::replay(&config, &match_id, speed, !no_commentary),
        Commands::Audio {
            match_id,
            url,
            max_chunks,
        } => commands::audio(&config, &match_id, &url, max_chunks),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;

    pub fn replay(config: &Config, match_id: &str, speed: f64, include_commentary: bool) -> Result<()> {
        let live = &config.live;
        let model = ChatClient::from_config(live)?;
        let publisher = ContentApi::from_config(live)?;
        let espn = EspnClient::new(&live.espn_base_url)?;

        println!("Match replay agent");
        println!("  Match ID: {}", match_id);
        println!("  Speed:    {}x", speed);
        println!("  Model:    {}", model.model());

        let summary = espn.summary(match_id)?;
        let stop = StopFlag::on_ctrl_c()?;
        let mut session = AgentSession::new(match_id, &live.competition, "replay", "espn_replay");
        let posted = ReplayAgent::new(&model, &publisher)
            .speed(speed)
            .include_commentary(include_commentary)
            .with_stop(stop.clone())
            .replay(&mut session, &summary);

        if stop.is_stopped() {
            println!("\nReplay stopped by user: {} events posted", posted);
        } else {
            println!("\nReplay complete: {} events posted", posted);
        }
        Ok(())
    }

    pub fn audio(config: &Config, match_id: &str, url: &str, max_chunks: Option<usize>) -> Result<()> {
        let live = &config.live;
        let model = ChatClient::from_config(live)?;
        let transcriber = Transcriber::from_config(live)?;
        let publisher = ContentApi::from_config(live)?;
        let espn = EspnClient::new(&live.espn_base_url)?;

        println!("Audio commentary agent");
        println!("  Stream:   {}", url);
        println!("  Match ID: {}", match_id);
        println!("  Chunks:   {}s", live.chunk_secs);

        let mut session =
            AgentSession::new(match_id, &live.competition, "hybrid", "youtube_audio").starting_at(500);
        let stop = StopFlag::on_ctrl_c()?;
        let agent =
            AudioAgent::new(&model, &publisher, &transcriber, &espn, live.chunk_secs).with_stop(stop.clone());
        let posted = agent.run(&mut session, url, max_chunks)?;

        if stop.is_stopped() {
            println!("\nStopped by user");
        }
        println!("  Events posted: {}", posted);
        println!("  Events sent this session: {}", session.posted_count());
        Ok(())
    }
}
