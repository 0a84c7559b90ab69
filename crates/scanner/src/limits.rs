pub const MAX_SCAN_CONCURRENCY: usize = 32;

pub const SCAN_CONCURRENCY_ENV: &str = "RECON_SCAN_CONCURRENCY";

pub fn default_scan_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(1, MAX_SCAN_CONCURRENCY)
}

pub fn parse_scan_concurrency(raw: Option<&str>, default_value: usize) -> usize {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default_value)
        .clamp(1, MAX_SCAN_CONCURRENCY)
}

/// Worker count from `RECON_SCAN_CONCURRENCY`, or `None` when the variable is unset.
pub fn scan_concurrency_from_env() -> Option<usize> {
    let raw = std::env::var(SCAN_CONCURRENCY_ENV).ok()?;
    Some(parse_scan_concurrency(
        Some(&raw),
        default_scan_concurrency(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_scan_concurrency_defaults_and_clamps() {
        let default_value = default_scan_concurrency();
        assert_eq!(parse_scan_concurrency(None, default_value), default_value);
        assert_eq!(parse_scan_concurrency(Some(""), default_value), default_value);
        assert_eq!(
            parse_scan_concurrency(Some("   "), default_value),
            default_value
        );
        assert_eq!(parse_scan_concurrency(Some("2"), default_value), 2);
        assert_eq!(parse_scan_concurrency(Some("0"), default_value), 1);
        assert_eq!(
            parse_scan_concurrency(Some("999"), default_value),
            MAX_SCAN_CONCURRENCY
        );
        assert_eq!(
            parse_scan_concurrency(Some("abc"), default_value),
            default_value
        );
        assert_eq!(parse_scan_concurrency(Some(" 5 "), default_value), 5);
    }
}
