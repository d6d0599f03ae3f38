pub const SOURCE_URL: &str =
    "https://raw.githubusercontent.com/qianguyihao/original-drug-list/refs/heads/main/README.md";

/// Environment variables checked in order for the image search API key.
pub const IMAGE_API_KEY_ENV_NAMES: [&str; 2] = ["BING_IMAGE_KEY", "BING_IMAGE_API_KEY"];

pub const BING_IMAGE_ENDPOINT: &str = "https://api.bing.microsoft.com/v7.0/images/search";

pub const DEFAULT_DATASET_PATH: &str = "src/data/drug-data.json";
pub const DEFAULT_CACHE_PATH: &str = "cache/image-cache.json";
pub const DEFAULT_IMAGES_DIR: &str = "public/drug-images";

/// Negative cache results are trusted for this many days.
pub const IMAGE_CACHE_TTL_DAYS: i64 = 7;

/// Pause after every real image search request, in milliseconds.
pub const DEFAULT_SEARCH_DELAY_MS: u64 = 150;

/// Pause after every downloaded image, in milliseconds.
pub const DEFAULT_DOWNLOAD_DELAY_MS: u64 = 400;

pub(crate) const COUNTS_HEADING: &str = "药品分类及数量";

pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

pub(crate) const TOTAL_PREFIX: &str = r"^- 已收录[约全计]*\s*";
pub(crate) const UPDATED_PREFIX: &str = r"^- 统计截止时间：?";
pub(crate) const SOURCE_PREFIX: &str = r"^- 数据来源：?";
pub(crate) const COUNT_LINE: &str = r"^- (.+?)：\s*([0-9]+)";
