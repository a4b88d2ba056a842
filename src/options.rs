use crate::utils::validate_basic_auth;
use clap::{Parser, ValueHint, value_parser};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use url::Url;

/// Default values used throughout the project.
pub mod defaults {
    /// Maximum number of concurrent network requests.
    pub const SEMAPHORE: u8 = 4;

    /// The default timeout for network requests, in seconds.
    pub const TIMEOUT: u64 = 10;

    /// The default user agent header value used for network requests.
    pub const USER_AGENT: &str = concat!(
        "Mozilla/5.0 (compatible; Sitegraph/",
        env!("CARGO_PKG_VERSION"),
        ")"
    );

    /// How many link levels below the root URL are crawled.
    pub const MAX_DEPTH: usize = 5;

    /// Upper bound on the number of pages fetched in one run.
    pub const MAX_PAGES: usize = 500;

    /// PageRank damping factor.
    pub const DAMPING: f64 = 0.85;

    /// L1 convergence threshold for the PageRank iteration.
    pub const EPSILON: f64 = 1e-8;

    /// PageRank iteration cap when the scores refuse to settle.
    pub const MAX_ITERATIONS: usize = 100;
}

fn validate_output_dir_str(s: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(shellexpand::tilde(s).into_owned());
    if path.exists() && path.is_dir() {
        println!(
            "\n⚠️ The output directory '{}' already exists. Existing documents will be overwritten.\n",
            path.display()
        );
        Ok(path)
    } else if path.exists() && !path.is_dir() {
        Err(format!(
            "❌ The output path '{}' is not a directory or is not writable.",
            path.display()
        ))
    } else {
        fs::create_dir_all(&path).map_err(|e| format!("Failed to create directory: {}", e))?;
        Ok(path)
    }
}

fn parse_damping(value: &str) -> Result<f64, String> {
    let parsed: f64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a valid number.", value))?;
    if parsed <= 0.0 || parsed >= 1.0 {
        return Err(format!(
            "Value '{}' must be strictly between 0.0 and 1.0.",
            value
        ));
    }
    Ok(parsed)
}

/// Parses a rate limit given as `requests/time[unit]` into requests per
/// minute, e.g. `60/1s` -> 3600, `30/2m` -> 15, `360/1h` -> 6.
///
/// # Errors
///
/// Returns an error message when the format, the request count, the time
/// value or the unit is invalid, or when the resulting rate is below one
/// request per minute.
pub fn parse_rate_limit(value: &str) -> Result<u32, String> {
    let parts: Vec<&str> = value.split('/').collect();
    if parts.len() != 2 || parts[1].len() < 2 {
        return Err(String::from(
            "Rate limit must be in the format 'requests/time[unit]'",
        ));
    }

    let requests: f64 = parts[0]
        .parse()
        .map_err(|_| String::from("Invalid request count"))?;

    let (time_value, unit) = parts[1].split_at(parts[1].len() - 1);
    let time_value: f64 = time_value
        .parse()
        .map_err(|_| String::from("Invalid time value"))?;
    if time_value <= 0.0 {
        return Err(String::from("Invalid time value"));
    }

    let minutes = match unit {
        "s" => time_value / 60.0,
        "m" => time_value,
        "h" => time_value * 60.0,
        _ => return Err(String::from("Time unit must be one of 's', 'm' or 'h'")),
    };

    let per_minute = requests / minutes;
    if per_minute < 1.0 {
        return Err(String::from(
            "Rate limit must be at least one request per minute",
        ));
    }
    Ok(per_minute.round() as u32)
}

#[derive(Debug, Parser)]
#[command(term_width = 80)]
pub struct Cli {
    #[arg(
        help = "The root URL of the site to crawl and analyze.",
        value_hint = ValueHint::Url,
        value_parser = value_parser!(Url)
    )]
    pub root_url: Url,

    #[arg(
        long,
        help = "Basic authentication credentials in the format `username:password`",
        value_parser = validate_basic_auth,
    )]
    pub basic_auth: Option<String>,

    #[arg(
        short = 'c',
        long,
        help = "Maximum number of concurrent requests allowed",
        default_value_t = defaults::SEMAPHORE as u8,
        value_parser = clap::value_parser!(u8).range(1..=100)
    )]
    pub concurrency_limit: u8,

    #[arg(
        short = 'o',
        long,
        help = "Directory where the mirrored documents and the report files will be saved",
        value_hint = ValueHint::DirPath,
        value_parser = validate_output_dir_str
    )]
    pub output_dir: Option<PathBuf>,

    #[arg(
        short = 'd',
        long,
        help = "Maximum link depth below the root URL to follow",
        default_value_t = defaults::MAX_DEPTH,
    )]
    pub max_depth: usize,

    #[arg(
        short = 'n',
        long,
        help = "Maximum number of pages to fetch in one run",
        default_value_t = defaults::MAX_PAGES,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub max_pages: usize,

    #[arg(
        short = 'a',
        long,
        help = "Append a random timestamp to each URL to bypass caching mechanisms",
        default_value = "false"
    )]
    pub append_timestamp: bool,

    #[arg(
        short = 'r',
        long,
        help = "File path for a CSV export of the per-node metrics",
        value_hint = ValueHint::FilePath,
        value_parser = clap::value_parser!(PathBuf)
    )]
    pub report_csv: Option<PathBuf>,

    #[arg(
        short = 't',
        long,
        help = "Default timeout (in seconds) for each request",
        default_value_t = defaults::TIMEOUT as u8,
        value_parser = clap::value_parser!(u8).range(1..=60)
    )]
    pub request_timeout: u8,

    #[arg(
        long,
        help = "Custom User-Agent header to be used in requests",
        default_value_t = defaults::USER_AGENT.to_string(),
    )]
    pub user_agent: String,

    #[arg(
        long,
        help = "Throttle requests, given as 'requests/time[unit]' with unit one of s, m or h. E.g. '100/1m' for 100 requests per minute.",
        value_parser = parse_rate_limit,
    )]
    pub rate_limit: Option<u32>,

    #[arg(
        long,
        help = "PageRank damping factor, strictly between 0 and 1",
        default_value_t = defaults::DAMPING,
        value_parser = parse_damping,
    )]
    pub damping: f64,

    #[arg(
        short = 'f',
        long,
        help = "Controls automatic redirects. When enabled, the client will follow HTTP redirects (up to 10 by default). Note that for security, Basic Authentication credentials are intentionally not forwarded during redirects to prevent unintended credential exposure."
    )]
    pub follow_redirects: bool,

    #[arg(
        long,
        help = "Path to a TOML config file. Defaults to `sitegraph.toml` or `~/.config/sitegraph/config.toml` when present.",
        value_hint = ValueHint::FilePath,
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        help = "Print a machine-readable JSON summary to stdout instead of the text report"
    )]
    pub json: bool,
}

/// Optional TOML configuration. Every field mirrors a CLI argument; values
/// given on the command line take priority.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub user_agent: Option<String>,
    pub concurrency_limit: Option<u8>,
    pub rate_limit: Option<String>,
    pub request_timeout: Option<u8>,
    pub basic_auth: Option<String>,
    pub follow_redirects: Option<bool>,
    pub append_timestamp: Option<bool>,
    pub max_depth: Option<usize>,
    pub max_pages: Option<usize>,
    pub damping: Option<f64>,
    pub output_dir: Option<String>,
    pub report_csv: Option<String>,
}

impl ConfigFile {
    /// Loads the config from an explicit path, or from the first well-known
    /// location that exists. No config file at all is fine and yields the
    /// empty default.
    ///
    /// # Errors
    ///
    /// An explicitly given path that does not exist, an unreadable file, or
    /// invalid TOML.
    pub fn load(path: Option<&PathBuf>) -> Result<ConfigFile, String> {
        let candidate = match path {
            Some(explicit) => {
                let expanded =
                    PathBuf::from(shellexpand::tilde(&explicit.to_string_lossy()).into_owned());
                if !expanded.is_file() {
                    return Err(format!("Config file not found: {}", expanded.display()));
                }
                Some(expanded)
            }
            None => ["sitegraph.toml", "~/.config/sitegraph/config.toml"]
                .iter()
                .map(|location| PathBuf::from(shellexpand::tilde(location).into_owned()))
                .find(|location| location.is_file()),
        };

        let Some(config_path) = candidate else {
            return Ok(ConfigFile::default());
        };

        let raw = fs::read_to_string(&config_path)
            .map_err(|e| format!("Failed to read config file {}: {}", config_path.display(), e))?;
        toml::from_str(&raw)
            .map_err(|e| format!("Failed to parse config file {}: {}", config_path.display(), e))
    }
}

impl Cli {
    /// Applies config file values onto this instance. A CLI argument that
    /// was set explicitly (it differs from its default) wins over the
    /// config file.
    pub fn apply_config(&mut self, config: &ConfigFile) -> Result<(), String> {
        if self.user_agent == defaults::USER_AGENT {
            if let Some(user_agent) = &config.user_agent {
                self.user_agent = user_agent.clone();
            }
        }
        if self.concurrency_limit == defaults::SEMAPHORE {
            if let Some(limit) = config.concurrency_limit {
                self.concurrency_limit = limit;
            }
        }
        if self.request_timeout == defaults::TIMEOUT as u8 {
            if let Some(timeout) = config.request_timeout {
                self.request_timeout = timeout;
            }
        }
        if self.max_depth == defaults::MAX_DEPTH {
            if let Some(depth) = config.max_depth {
                self.max_depth = depth;
            }
        }
        if self.max_pages == defaults::MAX_PAGES {
            if let Some(pages) = config.max_pages {
                self.max_pages = pages;
            }
        }
        if self.damping == defaults::DAMPING {
            if let Some(damping) = config.damping {
                self.damping = damping;
            }
        }
        if self.rate_limit.is_none() {
            if let Some(rate_limit) = &config.rate_limit {
                self.rate_limit = Some(parse_rate_limit(rate_limit)?);
            }
        }
        if self.basic_auth.is_none() {
            if let Some(basic_auth) = &config.basic_auth {
                self.basic_auth = Some(validate_basic_auth(basic_auth)?);
            }
        }
        if self.output_dir.is_none() {
            if let Some(output_dir) = &config.output_dir {
                self.output_dir = Some(validate_output_dir_str(output_dir)?);
            }
        }
        if self.report_csv.is_none() {
            if let Some(report_csv) = &config.report_csv {
                self.report_csv = Some(PathBuf::from(
                    shellexpand::tilde(report_csv).into_owned(),
                ));
            }
        }
        if !self.follow_redirects {
            if let Some(follow) = config.follow_redirects {
                self.follow_redirects = follow;
            }
        }
        if !self.append_timestamp {
            if let Some(append) = config.append_timestamp {
                self.append_timestamp = append;
            }
        }
        Ok(())
    }
}
