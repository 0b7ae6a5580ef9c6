//! Universe filter for spot USDT pairs.
//!
//! Leveraged tokens (BTCUP, ETHBULL, ...) and other derivative-style names
//! share a quote asset with spot pairs but behave nothing like them, so they
//! are removed before feature extraction.

/// Quote asset every kept symbol must end with.
pub const QUOTE_SUFFIX: &str = "USDT";

/// Substrings that mark a leveraged or derivative product (case-insensitive).
pub const EXCLUDED_PATTERNS: &[&str] = &["UP", "DOWN", "BULL", "BEAR", "3L", "3S"];

/// Returns true for a plain spot pair quoted in USDT.
pub fn is_spot_usdt_pair(symbol: &str) -> bool {
    let upper = symbol.to_uppercase();
    if !upper.ends_with(QUOTE_SUFFIX) {
        return false;
    }
    if upper.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    !EXCLUDED_PATTERNS.iter().any(|p| upper.contains(p))
}

/// Keeps the symbols accepted by [`is_spot_usdt_pair`], preserving order.
pub fn filter_spot_usdt<I, S>(symbols: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    symbols
        .into_iter()
        .filter(|s| is_spot_usdt_pair(s.as_ref()))
        .map(|s| s.as_ref().to_string())
        .collect()
}
