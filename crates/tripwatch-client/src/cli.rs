//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// tripwatch - keep an eye on your Jet2 holiday bookings
#[derive(Debug, Parser)]
#[command(name = "tripwatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "TRIPWATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage tracked bookings
    Booking {
        #[command(subcommand)]
        action: BookingAction,
    },

    /// Fetch a booking and show its sensors
    Status {
        /// Booking reference
        reference: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List the calendar events of a booking
    Events {
        /// Booking reference
        reference: String,

        /// Include events that already started
        #[arg(long)]
        all: bool,
    },

    /// Download the current accommodation image of a booking
    Image {
        /// Booking reference
        reference: String,

        /// File to write the image to
        #[arg(long, short)]
        output: PathBuf,
    },

    /// Poll every tracked booking until interrupted
    Run {
        /// Log as JSON lines
        #[arg(long)]
        json_logs: bool,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Booking actions.
#[derive(Debug, Subcommand)]
pub enum BookingAction {
    /// Validate a booking upstream and start tracking it
    Add {
        /// Booking reference
        reference: String,

        /// Lead passenger date of birth (dd/mm/yyyy)
        #[arg(long)]
        date_of_birth: String,

        /// Lead passenger surname
        #[arg(long)]
        surname: String,

        /// Calendar to write events into (can be repeated)
        #[arg(long = "calendar", action = clap::ArgAction::Append)]
        calendars: Vec<String>,
    },

    /// Stop tracking a booking
    Remove {
        /// Booking reference
        reference: String,
    },

    /// List tracked bookings
    List,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
