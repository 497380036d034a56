//! Command-line interface definition.

use std::path::PathBuf;

use calend_core::{AddOptions, RelativeDay};
use clap::{Args, Parser, Subcommand};

/// calend - add and remove Google Calendar events from the terminal
#[derive(Debug, Parser)]
#[command(name = "calend")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "CALEND_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Initialize the command line tool with appropriate credentials
    Init {
        /// OAuth client credentials file downloaded from Google Cloud Console
        credentials: PathBuf,

        /// Re-run the consent flow even if tokens are stored
        #[arg(long)]
        force: bool,
    },

    /// Add a new calendar event
    Add(AddArgs),

    /// Delete all events with the given name
    Delete {
        /// Exact event title to delete
        #[arg(long, short)]
        name: String,
    },

    /// List events in the calendar
    List {
        /// Only show events with this exact title
        #[arg(long, short)]
        name: Option<String>,
    },

    /// Uninstall the command line tool, removing stored tokens and configuration
    Uninstall,

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Flags of the `add` command.
#[derive(Debug, Clone, Args)]
pub struct AddArgs {
    /// The name of the calendar event
    #[arg(long, short, default_value = "Untitled")]
    pub name: String,

    /// The starting hour of the calendar event
    #[arg(long, short, alias = "start_hour", default_value_t = 0)]
    pub start_hour: u32,

    /// The ending hour of the calendar event
    #[arg(long, short, alias = "end_hour", default_value_t = 23)]
    pub end_hour: u32,

    /// The starting minute of the calendar event
    #[arg(long, visible_alias = "sm", alias = "start_minute", default_value_t = 0)]
    pub start_minute: u32,

    /// The ending minute of the calendar event
    #[arg(long, visible_alias = "em", alias = "end_minute", default_value_t = 0)]
    pub end_minute: u32,

    /// The day of the month of the calendar event
    #[arg(long, visible_alias = "dt")]
    pub date: Option<u32>,

    /// The month of the calendar event, as a number
    #[arg(long, short)]
    pub month: Option<u32>,

    /// The relative day of the calendar event: today or tomorrow
    #[arg(long, short)]
    pub day: Option<RelativeDay>,

    /// Create the event every two weeks, the given number of times
    #[arg(long, visible_alias = "fnly", value_name = "COUNT")]
    pub fortnightly: Option<u32>,

    /// Create the event every FREQ_DAYS days, COUNT times
    #[arg(long, short, num_args = 2, value_names = ["FREQ_DAYS", "COUNT"])]
    pub repeat: Option<Vec<u32>>,

    /// Make a weekly recurring event with the given number of occurrences
    #[arg(long, visible_alias = "wly", value_name = "COUNT")]
    pub weekly: Option<u32>,

    /// Make a daily recurring event with the given number of occurrences
    #[arg(long, visible_alias = "dly", value_name = "COUNT")]
    pub daily: Option<u32>,

    /// Create one event per line of the file; each line is "NAME HHMM HHMM"
    #[arg(long, short)]
    pub filename: Option<PathBuf>,

    /// Print the requests as JSON instead of sending them
    #[arg(long)]
    pub dry_run: bool,
}

impl AddArgs {
    /// Returns the scheduling flags.
    pub fn options(&self) -> AddOptions {
        AddOptions {
            date: self.date,
            month: self.month,
            day: self.day,
            fortnightly: self.fortnightly,
            repeat: self.repeat.as_deref().and_then(|r| match r {
                [interval, count] => Some((*interval, *count)),
                _ => None,
            }),
            weekly: self.weekly,
            daily: self.daily,
        }
    }
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Dump,

    /// Check the configuration file and credentials
    Validate,

    /// Show the configuration file path
    Path,
}
