//! The drugmap library turns the curated original-drug markdown list into a
//! JSON dataset for the front-end, attaching a product photo or a generated
//! placeholder image to every drug.

pub mod compose;
pub mod constants;
pub mod download;
pub mod model;
pub mod parse;
pub mod placeholder;
pub mod search;
pub mod storage;
pub mod text;

pub use compose::{GenerateOptions, build_dataset, compose, generate};
pub use download::{DownloadOptions, download_images};
pub use model::{DrugCategory, DrugDataset, DrugItem, DrugSummary};
pub use placeholder::placeholder_image;
pub use search::image_api_key_from_env;
pub use storage::ImageCache;
