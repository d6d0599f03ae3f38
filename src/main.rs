//! drugmap is a CLI tool that builds the drug catalogue dataset from the
//! original-drug markdown list.
//!
//! The tool has three commands:
//! 1. `generate` - Fetches the list, attaches images and writes the dataset JSON
//! 2. `download` - Saves the image of every dataset item to a local directory
//! 3. `placeholder` - Prints the placeholder image of a single drug

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Builder;
use log::{LevelFilter, info};

use drugmap::{
    DownloadOptions, GenerateOptions,
    compose::generate,
    constants::{
        DEFAULT_CACHE_PATH, DEFAULT_DATASET_PATH, DEFAULT_DOWNLOAD_DELAY_MS, DEFAULT_IMAGES_DIR,
        DEFAULT_SEARCH_DELAY_MS, SOURCE_URL,
    },
    download::download_images,
    placeholder::placeholder_image,
    search::{BingImageSearch, ImageSearch, SearchContext, image_api_key_from_env, rate_limiter},
};

/// A CLI tool to build the drug catalogue dataset from the original-drug list
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The command to execute
    #[command(subcommand)]
    command: Command,

    #[arg(long, short, action = clap::ArgAction::Count, help = "Output v(v...)erbosity: error (0), warn (1), info (2), debug (3), trace (4)", global = true, default_value_t = 2)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch the markdown list and write the dataset JSON
    Generate {
        /// Path to the dataset file to write
        #[arg(long, short, default_value = DEFAULT_DATASET_PATH)]
        output: PathBuf,
        /// Path to the image cache file
        #[arg(long, short, default_value = DEFAULT_CACHE_PATH)]
        cache: PathBuf,
        /// URL of the markdown list
        #[arg(long, short, default_value = SOURCE_URL)]
        source: String,
        /// Delay after every image search request in milliseconds
        #[arg(long, short, default_value_t = DEFAULT_SEARCH_DELAY_MS)]
        delay: u64,
        /// Rate limit: image search requests per minute (default: no limit)
        #[arg(long, short = 'r')]
        rpm: Option<u32>,
    },
    /// Save the image of every dataset item to a directory
    Download {
        /// Path to the dataset file to read
        #[arg(long, default_value = DEFAULT_DATASET_PATH)]
        dataset: PathBuf,
        /// Directory to save images to
        #[arg(long, short, default_value = DEFAULT_IMAGES_DIR)]
        output: PathBuf,
        /// Only download these brand names
        #[arg(long, short, num_args = 1..)]
        names: Option<Vec<String>>,
        /// Stop after this many images (for debugging)
        #[arg(long, short)]
        limit: Option<usize>,
        /// Delay after every saved image in milliseconds
        #[arg(long, short, default_value_t = DEFAULT_DOWNLOAD_DELAY_MS)]
        sleep: u64,
    },
    /// Print the placeholder image data URI of a drug
    Placeholder {
        /// Brand name of the drug
        brand: String,
        /// Generic name of the drug
        generic: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    Builder::new()
        .filter_level(match cli.verbose {
            0 => LevelFilter::Error,
            1 => LevelFilter::Warn,
            2 => LevelFilter::Info,
            3 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        })
        .init();

    match cli.command {
        Command::Generate {
            output,
            cache,
            source,
            delay,
            rpm,
        } => {
            let options = GenerateOptions {
                source_url: source,
                output_path: output,
                cache_path: cache,
            };
            handle_generate_command(options, delay, rpm).await
        }
        Command::Download {
            dataset,
            output,
            names,
            limit,
            sleep,
        } => {
            let options = DownloadOptions {
                dataset_path: dataset,
                output_dir: output,
                names: names.map(|names| names.into_iter().collect::<HashSet<_>>()),
                limit: limit.filter(|limit| *limit > 0),
                delay: Duration::from_millis(sleep),
            };
            download_images(&options).await.map(|_| ())
        }
        Command::Placeholder { brand, generic } => {
            println!("{}", placeholder_image(&brand, &generic));
            Ok(())
        }
    }
}

async fn handle_generate_command(
    options: GenerateOptions,
    delay: u64,
    rpm: Option<u32>,
) -> Result<()> {
    let bing = image_api_key_from_env().map(BingImageSearch::new);
    if bing.is_some() {
        info!("Image search API key is provided");
    }

    let limiter = rpm.and_then(rate_limiter);
    let ctx = SearchContext {
        search: bing.as_ref().map(|bing| bing as &dyn ImageSearch),
        delay: Duration::from_millis(delay),
        rate_limiter: limiter.as_ref(),
    };

    generate(&options, &ctx).await.map(|_| ())
}
