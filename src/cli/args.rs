use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::utils::DailyPolicy;

#[derive(Parser)]
#[command(name = "aq-etl")]
#[command(about = "Daily air quality and weather ETL into a relational store")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Configuration file [default: aq-etl.toml if present]")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(long, global = true, help = "Hide the progress bar")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load one day for every configured location
    Daily {
        #[arg(short, long, value_enum, help = "Target day [default: from configuration, else yesterday]")]
        policy: Option<DailyPolicy>,
    },

    /// Load a range of past days for every configured location
    Backfill {
        #[arg(
            short,
            long,
            conflicts_with_all = ["start", "end"],
            help = "Number of days before today [default: 28]"
        )]
        days: Option<u32>,

        #[arg(long, requires = "end", help = "First day (YYYY-MM-DD), inclusive")]
        start: Option<NaiveDate>,

        #[arg(long, requires = "start", help = "Last day (YYYY-MM-DD), inclusive")]
        end: Option<NaiveDate>,
    },

    /// Create the database schema if it does not exist
    InitDb,

    /// List the configured locations
    Locations,
}
