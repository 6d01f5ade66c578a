//! Logging setup and log hygiene helpers

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;
use tracing_subscriber::EnvFilter;

/// Installs a fmt subscriber filtered by `VCD_LOG` (default `warn`).
///
/// Safe to call more than once; only the first call installs the subscriber.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env("VCD_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// False when `VCD_LOG_SKIP_HTTP_BODY` is set to a truthy value.
pub fn log_http_bodies() -> bool {
    !matches!(
        std::env::var("VCD_LOG_SKIP_HTTP_BODY").as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE") | Ok("yes")
    )
}

fn password_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<(\w+:)?Password>.*?</(\w+:)?Password>")
            .unwrap_or_else(|e| panic!("invalid password pattern: {}", e))
    })
}

/// Masks password elements in XML bodies before they reach the log.
pub fn sanitize_body(body: &str) -> Cow<'_, str> {
    password_regex().replace_all(body, "<Password>********</Password>")
}
