//! Default lifetimes per endpoint family.

use std::time::Duration;

const MINUTE: u64 = 60;

/// Lifetime used for tools listings and for any path no rule matches.
pub const TOOLS_LIFETIME: Duration = Duration::from_secs(7 * MINUTE);

/// `(path fragment, lifetime)` rules, checked in order; first hit wins.
pub const DEFAULT_LIFETIMES: [(&str, Duration); 5] = [
    ("/tools", TOOLS_LIFETIME),
    ("/categories", Duration::from_secs(10 * MINUTE)),
    ("/submissions", Duration::from_secs(5 * MINUTE)),
    ("/featured", Duration::from_secs(8 * MINUTE)),
    ("/contact", Duration::from_secs(5 * MINUTE)),
];

/// Picks the default lifetime for a request path.
pub fn lifetime_for_path(path: &str) -> Duration {
    DEFAULT_LIFETIMES
        .iter()
        .find(|(fragment, _)| path.contains(fragment))
        .map(|(_, lifetime)| *lifetime)
        .unwrap_or(TOOLS_LIFETIME)
}
