use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use edinet_yuho::edinet::ListingType;

#[derive(Parser)]
#[command(name = "edinet-yuho")]
#[command(about = "Download EDINET annual securities reports of listed companies, once each")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the ledger, download and log directories
    Init,

    /// Fetch listings for a date range and download new securities reports
    Fetch {
        /// First submission date (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,

        /// Last submission date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Listing type: 1 = metadata only, 2 = metadata and data
        #[arg(long)]
        listing_type: Option<ListingType>,
    },
}
