use clap::{Parser, Subcommand};

/// Command-line interface definition for rfacelog
/// Face-recognition attendance log backed by SQLite
#[derive(Parser)]
#[command(
    name = "rfacelog",
    version = env!("CARGO_PKG_VERSION"),
    about = "Face-recognition attendance: IN/OUT decisions, corrections and audit trail on SQLite",
    long_about = None
)]
pub struct Cli {
    /// Override database path (useful for tests or custom DB)
    #[arg(global = true, long = "db")]
    pub db: Option<String>,

    /// Run in test mode (no config file update)
    #[arg(global = true, long = "test", hide = true)]
    pub test: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and configuration
    Init,

    /// Manage the configuration file (view or edit)
    Config {
        #[arg(long = "print", help = "Print the current configuration")]
        print_config: bool,

        #[arg(
            long = "edit",
            help = "Edit the configuration file (default editor: $EDITOR, or nano/notepad)"
        )]
        edit_config: bool,

        #[arg(long = "editor", help = "Specify the editor to use")]
        editor: Option<String>,
    },

    /// Manage enrolled persons and their feature vectors
    Person {
        #[command(subcommand)]
        action: PersonAction,
    },

    /// Identity cache maintenance
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Recognize one face and record the attendance decision
    Recognize {
        #[arg(long = "device", help = "Device identifier")]
        device: String,

        #[arg(long = "vector", value_name = "FILE", help = "JSON array produced by the embedding model")]
        vector: String,

        #[arg(long = "face-px", help = "Minimum side of the face crop, in pixels")]
        face_px: u32,

        #[arg(long = "at", help = "Decision time (RFC 3339), defaults to now")]
        at: Option<String>,
    },

    /// Recognize every face of a detection document
    RecognizeGroup {
        #[arg(long = "device", help = "Device identifier")]
        device: String,

        #[arg(long = "faces", value_name = "FILE", help = "JSON list of {bbox, quality, embedding}")]
        faces: String,

        #[arg(long = "at", help = "Decision time (RFC 3339), defaults to now")]
        at: Option<String>,
    },

    /// Re-attribute an event to another person
    Correct {
        /// Event id
        id: i64,

        #[arg(long = "name", help = "New final name")]
        name: String,

        #[arg(long = "note", help = "Reason for the correction")]
        note: Option<String>,

        #[arg(long = "actor", default_value = "admin", help = "Who is correcting")]
        actor: String,
    },

    /// Show or change the attendance policy
    Policy {
        #[command(subcommand)]
        action: PolicyAction,
    },

    /// List attendance events (newest first)
    Events {
        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        name: Option<String>,

        #[arg(long, help = "Day (YYYY-MM-DD)")]
        day: Option<String>,

        #[arg(long)]
        device: Option<String>,

        #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(1..=500))]
        limit: u32,

        #[arg(long, default_value_t = 0)]
        offset: u32,

        #[arg(long, help = "Print JSON instead of a table")]
        json: bool,
    },

    /// List daily attendance aggregates
    Daily {
        #[arg(long, help = "Day (YYYY-MM-DD)")]
        day: Option<String>,

        #[arg(long, help = "Month (YYYY-MM)")]
        month: Option<String>,

        #[arg(long)]
        name: Option<String>,

        #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(1..=500))]
        limit: u32,

        #[arg(long, default_value_t = 0)]
        offset: u32,

        #[arg(long, help = "Print JSON instead of a table")]
        json: bool,
    },

    /// Manage the database (migrations, retention, rebuilds)
    Db {
        #[arg(long = "migrate", help = "Run pending database migrations")]
        migrate: bool,

        #[arg(long = "check", help = "Check database integrity")]
        check: bool,

        #[arg(long = "sweep", help = "Delete rows older than the retention horizon")]
        sweep: bool,

        #[arg(long = "reset", help = "Delete all events and daily records")]
        reset: bool,

        #[arg(
            long = "rebuild-daily",
            value_name = "DAY",
            help = "Recompute the daily records of a day from its events"
        )]
        rebuild_daily: Option<String>,

        #[arg(long = "info", help = "Show database information")]
        info: bool,
    },

    /// Print or manage the internal log table
    Log {
        #[arg(long = "print", help = "Print rows from the internal log table")]
        print: bool,
    },
}

#[derive(Subcommand)]
pub enum PersonAction {
    /// Create a person (no-op if it exists)
    Add { name: String },

    /// Add feature vectors to a person
    Enroll {
        name: String,

        #[arg(long = "vectors", value_name = "FILE", help = "JSON vector or list of vectors")]
        vectors: String,

        #[arg(long = "create", help = "Create the person if missing")]
        create: bool,
    },

    /// List persons with their vector counts
    List {
        #[arg(long, help = "Print JSON instead of a table")]
        json: bool,
    },

    /// Delete a person and all their vectors
    Delete { name: String },

    /// Remove a single stored vector
    RemoveEmbedding { id: i64 },
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// Rebuild the identity cache from the feature store and report it
    Rebuild,
}

#[derive(Subcommand)]
pub enum PolicyAction {
    /// Print the current policy
    Show {
        #[arg(long, help = "Print JSON")]
        json: bool,
    },

    /// Update policy fields
    Set {
        #[arg(long)]
        timezone: Option<String>,

        #[arg(long = "in-start", value_name = "HH:MM")]
        in_start: Option<String>,

        #[arg(long = "late-after", value_name = "HH:MM")]
        late_after: Option<String>,

        #[arg(long = "out-start", value_name = "HH:MM")]
        out_start: Option<String>,

        #[arg(long = "out-end", value_name = "HH:MM", conflicts_with = "no_out_end")]
        out_end: Option<String>,

        #[arg(long = "no-out-end", help = "Remove the OUT upper bound")]
        no_out_end: bool,

        #[arg(long = "cooldown", value_name = "SECONDS")]
        cooldown: Option<i64>,

        #[arg(long = "retention", value_name = "DAYS")]
        retention: Option<i64>,
    },
}
