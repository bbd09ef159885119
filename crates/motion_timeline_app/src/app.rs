// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command-line driver: parses a command, runs it against a headless session
//! and produces a JSON-serializable report.

use clap::{Parser, Subcommand};
use motion_timeline::config::CONFIG_FILE_NAME;
use motion_timeline::{
    persist, DcmSong, EditorConfig, HeadlessHost, SharedClipboard, TimelineDocument,
    TimelineError, TimelineSession,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Application errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Path does not name a timeline file
    #[error("Invalid timeline path: {}", .0.display())]
    InvalidPath(PathBuf),

    /// Timeline engine rejected an operation
    #[error(transparent)]
    Timeline(#[from] TimelineError),

    /// Report could not be encoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Headless motion timeline driver
#[derive(Debug, Parser)]
#[command(name = "motion_timeline_app", version, about = "Headless driver for motion timelines")]
pub struct Cli {
    /// Editor config file
    #[arg(long, global = true, default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Driver commands
#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Create and save an empty timeline under the timeline directory
    New {
        /// Animation name
        #[arg()]
        name: String,
        /// Sub-directory under the timeline directory
        #[arg()]
        dir: Option<String>,
    },
    /// Print a summary of a timeline file
    Inspect {
        /// Timeline file
        #[arg()]
        path: PathBuf,
    },
    /// Play a timeline against the headless host
    Play {
        /// Timeline file
        #[arg()]
        path: PathBuf,
        /// Number of ticks to run
        #[arg()]
        ticks: u32,
    },
    /// Build every animation and the song description
    Export {
        /// Timeline file
        #[arg()]
        path: PathBuf,
    },
    /// Write the default editor config
    InitConfig {
        /// Destination
        #[arg(default_value = CONFIG_FILE_NAME)]
        path: PathBuf,
    },
}

/// Per-layer part of a summary
#[derive(Debug, Clone, Serialize)]
pub struct LayerSummary {
    /// Layer display key
    pub key: String,
    /// Persisted tag
    pub tag: String,
    /// Keyed frame numbers
    pub frames: Vec<u32>,
    /// Number of keyed bones over all frames
    pub keys: usize,
}

/// Per-track part of a summary
#[derive(Debug, Clone, Serialize)]
pub struct TrackSummary {
    /// Track name
    pub name: String,
    /// Window start
    pub start_frame_no: u32,
    /// Window end
    pub end_frame_no: u32,
    /// Whether this is the active track
    pub active: bool,
}

/// Document overview
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    /// Animation name
    pub anm_name: String,
    /// Sub-directory
    pub directory_name: String,
    /// Last frame
    pub max_frame_no: u32,
    /// Frames per second
    pub frame_rate: f32,
    /// Layers in order
    pub layers: Vec<LayerSummary>,
    /// Tracks in order
    pub tracks: Vec<TrackSummary>,
}

impl DocumentSummary {
    /// Summarize a document
    pub fn new(document: &TimelineDocument) -> Self {
        let active = document.active_track().map(|t| t.id);
        Self {
            anm_name: document.anm_name.clone(),
            directory_name: document.directory_name.clone(),
            max_frame_no: document.max_frame_no(),
            frame_rate: document.frame_rate,
            layers: document
                .layers()
                .iter()
                .map(|layer| LayerSummary {
                    key: layer.key().to_string(),
                    tag: layer.tag().to_string(),
                    frames: layer.frames().map(|f| f.frame_no).collect(),
                    keys: layer.frames().map(|f| f.bone_count()).sum(),
                })
                .collect(),
            tracks: document
                .tracks()
                .iter()
                .map(|track| TrackSummary {
                    name: track.name.clone(),
                    start_frame_no: track.start_frame_no,
                    end_frame_no: track.end_frame_no,
                    active: Some(track.id) == active,
                })
                .collect(),
        }
    }
}

/// Outcome of a command
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Report {
    /// A timeline was created
    New {
        /// File written
        path: PathBuf,
    },
    /// A timeline was inspected
    Inspect {
        /// Summary of the file
        summary: DocumentSummary,
    },
    /// A timeline was played
    Play {
        /// Playhead after each tick
        frames: Vec<u32>,
        /// Playhead at the end
        final_frame_no: u32,
    },
    /// A timeline was exported
    Export {
        /// Animation file names
        animations: Vec<String>,
        /// Song description
        song: DcmSong,
    },
    /// A config file was written
    InitConfig {
        /// File written
        path: PathBuf,
    },
}

/// Open a timeline file in a session whose host targets every layer
fn open_session(config: &EditorConfig, path: &Path) -> Result<TimelineSession<HeadlessHost>> {
    let document = persist::load_document(path)?;
    let anm_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| AppError::InvalidPath(path.to_path_buf()))?;

    let mut host = HeadlessHost::new();
    for layer in document.layers() {
        host = host.with_target(layer.key());
    }

    let config = EditorConfig {
        timeline_dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
        ..config.clone()
    };
    let mut session = TimelineSession::new(config, host, Box::new(SharedClipboard::new()));
    session.load_timeline(anm_name, "")?;
    Ok(session)
}

/// Run a command
pub fn run(command: Command, config: &EditorConfig) -> Result<Report> {
    match command {
        Command::New { name, dir } => {
            let host = HeadlessHost::new().with_target(motion_timeline::LayerKey::default_motion());
            let mut session = TimelineSession::new(config.clone(), host, Box::new(SharedClipboard::new()));
            session.new_timeline()?;
            let mut document = session
                .document()
                .cloned()
                .ok_or(TimelineError::NoTimeline)?;
            document.anm_name = name;
            document.directory_name = dir.unwrap_or_default();
            let path = persist::save_document(&document, &config.timeline_dir)?;
            Ok(Report::New { path })
        }
        Command::Inspect { path } => {
            let document = persist::load_document(&path)?;
            Ok(Report::Inspect {
                summary: DocumentSummary::new(&document),
            })
        }
        Command::Play { path, ticks } => {
            let mut session = open_session(config, &path)?;
            session.play()?;
            let max_frame_no = session.document().map_or(0, TimelineDocument::max_frame_no);
            let mut frames = Vec::with_capacity(ticks as usize);
            for _ in 0..ticks {
                session.host_mut().advance(1, max_frame_no);
                session.tick();
                frames.push(session.current_frame_no());
            }
            session.stop();
            tracing::info!("Played {ticks} ticks of {}", path.display());
            Ok(Report::Play {
                final_frame_no: session.current_frame_no(),
                frames,
            })
        }
        Command::Export { path } => {
            let mut session = open_session(config, &path)?;
            let animations = session.output_anm()?;
            let song = session.output_dcm()?;
            Ok(Report::Export { animations, song })
        }
        Command::InitConfig { path } => {
            EditorConfig::default().save(&path)?;
            tracing::info!("Wrote default config to {}", path.display());
            Ok(Report::InitConfig { path })
        }
    }
}

/// Encode a report for printing
pub fn to_json(report: &Report) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
