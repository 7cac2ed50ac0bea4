//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args as ClapArgs, Parser, Subcommand};
use preview_fetch::FetchOptions;
use reqwest::header::{HeaderName, HeaderValue};

/// Fetch web pages for link previews under strict budgets.
///
/// Follows redirects and canonical links, caps download size and time, and
/// prints preview metadata, raw bodies, sizes, or percent-encoded URIs.
#[derive(Parser, Debug)]
#[command(name = "preview-fetch")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file to read instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub fetch: FetchArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Fetch budget overrides; each one beats the config file.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct FetchArgs {
    /// TCP/TLS connect timeout in seconds (1-3600)
    #[arg(
        long,
        global = true,
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..=3600)
    )]
    pub connect_timeout: Option<u64>,

    /// Read timeout and wall-clock body budget in seconds (1-3600)
    #[arg(
        long,
        global = true,
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..=3600)
    )]
    pub timeout: Option<u64>,

    /// Maximum requests per redirect chain (1-20)
    #[arg(
        long,
        global = true,
        value_name = "N",
        value_parser = clap::value_parser!(u32).range(1..=20)
    )]
    pub redirect_limit: Option<u32>,

    /// Maximum body size in KiB (1-1048576)
    #[arg(
        long,
        global = true,
        value_name = "KB",
        value_parser = clap::value_parser!(u64).range(1..=1_048_576)
    )]
    pub max_download_kb: Option<u64>,

    /// User-Agent sent with every request
    #[arg(long, global = true, value_name = "UA")]
    pub user_agent: Option<String>,

    /// Accept invalid TLS certificates
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Also follow 303, 307 and 308 redirects
    #[arg(long, global = true)]
    pub extended_redirects: bool,
}

impl FetchArgs {
    /// Applies the flags that were given on top of `options`.
    #[must_use]
    pub fn apply(&self, mut options: FetchOptions) -> FetchOptions {
        if let Some(secs) = self.connect_timeout {
            options.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.timeout {
            options.timeout = Duration::from_secs(secs);
        }
        if let Some(limit) = self.redirect_limit {
            options.redirect_limit = limit;
        }
        if let Some(kb) = self.max_download_kb {
            options.max_download_kb = kb;
        }
        if let Some(user_agent) = &self.user_agent {
            options.user_agent = Some(user_agent.clone());
        }
        if self.insecure {
            options.accept_invalid_certs = true;
        }
        if self.extended_redirects {
            options.follow_extended_redirects = true;
        }
        options
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print preview metadata for a page, following its canonical link
    Preview {
        /// Page URL
        url: String,

        /// Print metadata as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download a URL and write the body to stdout
    Fetch {
        /// URL to fetch
        url: String,

        /// Requests allowed for this chain, capped by --redirect-limit (0-20)
        #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(0..=20))]
        max_redirects: Option<u32>,

        /// Extra request header ('Name: value'); credentials stay on the first origin
        #[arg(short = 'H', long = "header", value_name = "HEADER", value_parser = parse_header)]
        headers: Vec<(HeaderName, HeaderValue)>,
    },

    /// Print the size a server reports for a URL without downloading it
    Size {
        /// URL to query
        url: String,
    },

    /// Percent-encode a URI component by component
    Encode {
        /// URI to encode
        uri: String,
    },

    /// Percent-decode text
    Decode {
        /// Text to decode
        text: String,
    },
}

/// Parses a `Name: value` header argument.
pub fn parse_header(raw: &str) -> Result<(HeaderName, HeaderValue), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected 'Name: value', got '{raw}'"))?;
    let name = HeaderName::from_bytes(name.trim().as_bytes())
        .map_err(|e| format!("invalid header name '{}': {e}", name.trim()))?;
    let value = HeaderValue::from_str(value.trim())
        .map_err(|e| format!("invalid value for header '{name}': {e}"))?;
    Ok((name, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_encode_parses_successfully() {
        let args = Args::try_parse_from(["preview-fetch", "encode", "http://a b"]).unwrap();
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(matches!(args.command, Command::Encode { ref uri } if uri == "http://a b"));
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["preview-fetch", "-v", "decode", "x"]).unwrap();
        assert_eq!(args.verbose, 1);

        let args = Args::try_parse_from(["preview-fetch", "decode", "x", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["preview-fetch", "--quiet", "size", "http://a"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["preview-fetch", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Args::try_parse_from(["preview-fetch", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_missing_subcommand_returns_error() {
        let err = Args::try_parse_from(["preview-fetch"]).unwrap_err();
        assert!(matches!(
            err.kind(),
            clap::error::ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                | clap::error::ErrorKind::MissingSubcommand
        ));
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let err =
            Args::try_parse_from(["preview-fetch", "--invalid-flag", "decode", "x"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_cli_preview_json_flag() {
        let args = Args::try_parse_from([
            "preview-fetch",
            "preview",
            "https://a.example",
            "--json",
        ])
        .unwrap();
        assert!(matches!(args.command, Command::Preview { json: true, .. }));
    }

    #[test]
    fn test_cli_fetch_headers_and_redirects() {
        let args = Args::try_parse_from([
            "preview-fetch",
            "fetch",
            "https://a.example",
            "--max-redirects",
            "2",
            "-H",
            "Accept-Language: de",
            "--header",
            "X-Trace:  abc ",
        ])
        .unwrap();
        let Command::Fetch {
            max_redirects,
            headers,
            ..
        } = args.command
        else {
            panic!("expected fetch command");
        };
        assert_eq!(max_redirects, Some(2));
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].0.as_str(), "accept-language");
        assert_eq!(headers[1].1, "abc");
    }

    #[test]
    fn test_cli_fetch_max_redirects_over_max_rejected() {
        let err = Args::try_parse_from([
            "preview-fetch",
            "fetch",
            "https://a.example",
            "--max-redirects",
            "21",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_malformed_header_rejected() {
        let err = Args::try_parse_from([
            "preview-fetch",
            "fetch",
            "https://a.example",
            "-H",
            "nocolon",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_redirect_limit_zero_rejected() {
        let err =
            Args::try_parse_from(["preview-fetch", "--redirect-limit", "0", "size", "http://a"])
                .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_fetch_args_apply_overrides_only_given_flags() {
        let args = Args::try_parse_from([
            "preview-fetch",
            "size",
            "http://a",
            "--timeout",
            "3",
            "--redirect-limit",
            "2",
            "--insecure",
        ])
        .unwrap();
        let base = FetchOptions::default();
        let options = args.fetch.apply(base.clone());

        assert_eq!(options.timeout, Duration::from_secs(3));
        assert_eq!(options.redirect_limit, 2);
        assert!(options.accept_invalid_certs);
        assert_eq!(options.connect_timeout, base.connect_timeout);
        assert_eq!(options.max_download_kb, base.max_download_kb);
        assert!(!options.follow_extended_redirects);
    }

    #[test]
    fn test_fetch_args_default_is_identity() {
        let base = FetchOptions::default();
        assert_eq!(FetchArgs::default().apply(base.clone()), base);
    }

    #[test]
    fn test_parse_header_trims_name_and_value() {
        let (name, value) = parse_header("  User-Agent :  probe/1.0 ").unwrap();
        assert_eq!(name.as_str(), "user-agent");
        assert_eq!(value, "probe/1.0");
    }

    #[test]
    fn test_parse_header_rejects_invalid_name() {
        assert!(parse_header("Bad Name: x").is_err());
        assert!(parse_header("no-separator").is_err());
    }
}
