//! Command Line Module
//! Subcommands and options for the bellpedia binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::charts::Region;
use crate::config::ImageFormat;
use crate::model::SearchField;

#[derive(Parser, Debug)]
#[command(name = "bellpedia")]
#[command(version, about = "Load, search and plot the Dove bell tower data")]
pub struct Cli {
    /// Settings file (defaults to config.yaml in the working directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Working directory the configured folders are relative to
    #[arg(short, long, global = true, default_value = ".")]
    pub root: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the world from the Dove CSVs or the saved snapshot
    Load {
        /// Re-read the CSVs and overwrite the snapshot
        #[arg(long)]
        refresh: bool,
    },

    /// Print the towers matching any of the given values
    Search {
        /// Field to match: name, place, dove_id, nbells, coordinates, postcode, country, county
        #[arg(short, long)]
        by: SearchField,

        /// Values to look for (coordinates as "lat,long")
        #[arg(required = true, allow_hyphen_values = true)]
        values: Vec<String>,
    },

    /// Print one tower and its bells
    Tower {
        /// Dove tower id
        id: i64,

        /// Also report the distance from this tower
        #[arg(long)]
        from: Option<i64>,
    },

    /// Match a spreadsheet of visited towers in the user data folder
    MyTowers {
        /// Workbook name without the .xlsx extension
        name: String,

        /// Column of the workbook to search by
        #[arg(short, long, default_value = "postcode")]
        by: SearchField,

        /// Don't write <name>_OUTPUT.xlsx
        #[arg(long)]
        no_save: bool,

        /// Read the workbook from this folder instead of the configured one
        #[arg(long)]
        user_dir: Option<PathBuf>,
    },

    /// Draw the tower map and histograms
    Plots {
        /// Map extent: a country or home nation, or world
        #[arg(long, default_value = "UK")]
        region: Region,

        /// Prefix for the plot file names
        #[arg(short, long, default_value = "")]
        prefix: String,

        /// Image format (png or svg); overrides the config
        #[arg(short, long)]
        format: Option<ImageFormat>,

        /// Only these plots (comma-separated, e.g. locations,freq)
        #[arg(long, value_delimiter = ',')]
        only: Option<Vec<String>>,

        /// Restrict the towers to a search on this field
        #[arg(long, requires = "value")]
        by: Option<SearchField>,

        /// Search values used with --by
        #[arg(long, requires = "by", allow_hyphen_values = true)]
        value: Vec<String>,
    },

    /// Print descriptive statistics and a per-country breakdown
    Stats,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
