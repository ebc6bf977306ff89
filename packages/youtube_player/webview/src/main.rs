//! Renders the player document a webview would load, for inspecting it in a
//! regular browser.
//!
//! # Usage
//!
//! ```text
//! youtube-player-document <VIDEO_ID> [--player-id <ID>] [--width <W>] [--height <H>]
//!     [--privacy-enhanced] [--debug] [--player-vars <JSON>] [--output <FILE>]
//! ```
//!
//! Defaults from `config.json5` in the config directory apply to unset
//! options, the same way they do for `initialize`, and its `logging` section
//! sets the log filter and file.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;
use youtube_player_config::file::{PlayerDefaults, PluginConfig};
use youtube_player_models::{PlayerOptions, PlayerSize, PlayerVars};
use youtube_player_webview::document::{CONSOLE_MESSAGE_HANDLER, render_document};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Video to cue in the player.
    #[arg(index = 1)]
    video_id: String,

    #[arg(long, default_value = "preview")]
    player_id: String,

    #[arg(long, default_value_t = 640)]
    width: u32,

    #[arg(long, default_value_t = 360)]
    height: u32,

    /// Embed from youtube-nocookie.com.
    #[arg(long)]
    privacy_enhanced: bool,

    /// Log every bridge message to the page console.
    #[arg(long)]
    debug: bool,

    /// `playerVars` as a JSON object, e.g. `{"autoplay": 1}`.
    #[arg(long)]
    player_vars: Option<String>,

    /// JavaScript function expression receiving the outbound messages.
    #[arg(long, default_value = CONSOLE_MESSAGE_HANDLER)]
    message_handler: String,

    /// Write the document here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Error)]
enum DocumentError {
    #[error("Invalid player vars: {0}")]
    PlayerVars(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Logging(#[from] youtube_player_logging::InitError),
}

fn options(
    args: &Args,
    defaults: Option<&PlayerDefaults>,
) -> Result<PlayerOptions, serde_json::Error> {
    let mut options = PlayerOptions::new(
        args.player_id.clone(),
        args.video_id.clone(),
        PlayerSize {
            width: args.width,
            height: args.height,
        },
    );

    if args.privacy_enhanced {
        options.privacy_enhanced = Some(true);
    }
    if args.debug {
        options.debug = Some(true);
    }
    if let Some(vars) = &args.player_vars {
        options.player_vars = Some(serde_json::from_str::<PlayerVars>(vars)?);
    }
    if let Some(defaults) = defaults {
        defaults.apply(&mut options);
    }

    Ok(options)
}

fn main() -> Result<(), DocumentError> {
    let args = Args::parse();

    let config = youtube_player_config::file::load_config();
    let logging = config
        .as_ref()
        .ok()
        .and_then(|x| x.logging.clone())
        .unwrap_or_default();
    let _layer = youtube_player_logging::init(
        logging.file.as_deref(),
        Some(logging.level.as_deref().unwrap_or("youtube_player=info")),
    )?;

    let config = config.unwrap_or_else(|e| {
        log::warn!("Failed to load config, using no defaults: {e}");
        PluginConfig::default()
    });
    let options = options(&args, config.defaults.as_ref())?;

    log::debug!("main: rendering document for {options:?}");

    let document = render_document(&options, &args.message_handler);

    if let Some(output) = &args.output {
        std::fs::write(output, document)?;
        log::info!("Wrote player document to {}", output.display());
    } else {
        print!("{document}");
    }

    Ok(())
}
