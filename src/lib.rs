#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::assigning_clones,
    clippy::doc_markdown,
    clippy::field_reassign_with_default,
    clippy::implicit_clone,
    clippy::items_after_statements,
    clippy::map_unwrap_or,
    clippy::manual_let_else,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::needless_pass_by_value,
    clippy::needless_raw_string_hashes,
    clippy::redundant_closure_for_method_calls,
    clippy::return_self_not_must_use,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::struct_field_names,
    clippy::too_many_lines,
    clippy::uninlined_format_args,
    clippy::unnecessary_literal_bound,
    clippy::unused_self,
    clippy::unnecessary_wraps
)]

use clap::Subcommand;
use serde::{Deserialize, Serialize};

pub mod catalog;
pub mod config;
pub mod console;
pub mod engine;
pub mod gateway;
pub mod infra;
pub mod sessions;

pub use config::Config;
pub use console::TrainingConsole;

/// Session management subcommands
#[derive(Subcommand, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionCommands {
    /// List sessions, most recently started first
    List {
        /// Show only the N most recent sessions
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show one session with its scenario, avatar and observer
    Show {
        /// Session ID
        id: String,
    },
    /// Create a session and notify the engine
    #[command(long_about = "\
Create a training session.

The session starts as pending and is moved to running in the \
background, after which the integration payload is sent to the \
configured engine. References are not checked against the catalog.

Examples:
  vr-training-admin session create --scenario 1 --avatar 2 --observer 1")]
    Create {
        /// Scenario ID
        #[arg(long)]
        scenario: String,
        /// Avatar ID
        #[arg(long)]
        avatar: String,
        /// Observer profile ID
        #[arg(long)]
        observer: String,
    },
    /// Change the status of a session
    SetStatus {
        /// Session ID
        id: String,
        /// New status (pending, running, paused, completed, failed)
        status: String,
    },
    /// Delete a session
    Delete {
        /// Session ID
        id: String,
    },
    /// Print the integration payload the engine would receive
    Payload {
        /// Session ID
        id: String,
    },
}
