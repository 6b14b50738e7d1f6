//! Semver range checks with npm-specific range syntax.

use semver::{Version, VersionReq};

/// Check whether an installed version satisfies an npm-style range.
///
/// # Rules
/// - Empty range or `*` matches any parseable version
/// - Supports OR ranges like `^1.0.0 || ^2.0.0`
/// - Supports hyphen ranges (`1.0.0 - 2.0.0`), x-ranges (`1.x`, `1.0.x`) and
///   space-separated comparators (`>= 2.1.2 < 3.0.0`)
/// - Unparseable versions or ranges (git URLs, dist-tags) never satisfy
#[must_use]
pub fn version_satisfies(version: &str, range: &str) -> bool {
    let Ok(version) = Version::parse(version.trim()) else {
        return false;
    };

    let range = range.trim();
    if range.is_empty() || range == "*" {
        return true;
    }

    if range.contains("||") {
        return range
            .split("||")
            .map(str::trim)
            .filter(|alt| !alt.is_empty())
            .any(|alt| parse_range(alt).is_some_and(|req| req.matches(&version)));
    }

    parse_range(range).is_some_and(|req| req.matches(&version))
}

/// Parse a single version range, handling npm-specific syntax.
///
/// Handles:
/// - Standard semver ranges: ^1.0.0, ~1.0.0, >=1.0.0, etc.
/// - Hyphen ranges: 1.0.0 - 2.0.0
/// - X-ranges: 1.x, 1.0.x, *
/// - Space-separated comparators: >= 2.1.2 < 3.0.0
fn parse_range(range: &str) -> Option<VersionReq> {
    let range = range.trim();

    // Hyphen ranges: "1.0.0 - 2.0.0" -> ">=1.0.0, <=2.0.0"
    if let Some((start, end)) = parse_hyphen_range(range) {
        return VersionReq::parse(&format!(">={start}, <={end}")).ok();
    }

    // X-ranges: "1.x" -> ">=1.0.0, <2.0.0"
    if range.contains('x') || range.contains('X') || range == "*" {
        return VersionReq::parse(&convert_x_range(range)).ok();
    }

    // Space-separated comparators: ">= 2.1.2 < 3.0.0" -> ">=2.1.2, <3.0.0"
    VersionReq::parse(&convert_space_separated_comparators(range)).ok()
}

/// Parse a hyphen range like "1.0.0 - 2.0.0".
fn parse_hyphen_range(range: &str) -> Option<(String, String)> {
    let parts: Vec<&str> = range.split(" - ").collect();
    if parts.len() == 2 {
        let start = parts[0].trim();
        let end = parts[1].trim();
        if !start.is_empty() && !end.is_empty() {
            return Some((start.to_string(), end.to_string()));
        }
    }
    None
}

/// Convert space-separated comparators to comma-separated.
///
/// npm allows: ">= 2.1.2 < 3.0.0" which means ">=2.1.2 AND <3.0.0".
/// Rust semver requires: ">=2.1.2, <3.0.0".
fn convert_space_separated_comparators(range: &str) -> String {
    let range = range.trim();

    let mut result = String::new();
    let mut current_token = String::new();
    let mut need_comma = false;

    for c in range.chars() {
        if c == ' ' {
            if !current_token.is_empty() {
                let trimmed = current_token.trim();
                if !trimmed.is_empty() {
                    if token_has_version(trimmed) {
                        if need_comma {
                            result.push_str(", ");
                        }
                        result.push_str(trimmed);
                        need_comma = true;
                    } else {
                        // Operator without version, keep accumulating
                        if need_comma {
                            result.push_str(", ");
                            need_comma = false;
                        }
                        result.push_str(trimmed);
                    }
                }
                current_token.clear();
            }
        } else {
            current_token.push(c);
        }
    }

    if !current_token.is_empty() {
        let trimmed = current_token.trim();
        if !trimmed.is_empty() {
            if token_has_version(trimmed) && need_comma {
                result.push_str(", ");
            }
            result.push_str(trimmed);
        }
    }

    // If nothing was parsed (no spaces), return original
    if result.is_empty() {
        return range.to_string();
    }

    result
}

/// Check if a token contains a version number (has digits).
fn token_has_version(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_digit())
}

/// Convert x-range to semver range.
fn convert_x_range(range: &str) -> String {
    let range = range.trim();

    if range == "*" || range == "x" || range == "X" {
        return ">=0.0.0".to_string();
    }

    let parts: Vec<&str> = range.split('.').collect();

    match parts.as_slice() {
        [major, "x" | "X" | "*"] => {
            // "1.x" -> ">=1.0.0, <2.0.0"
            if let Ok(m) = major.parse::<u64>() {
                return format!(">={m}.0.0, <{}.0.0", m + 1);
            }
        }
        [major, minor, "x" | "X" | "*"] => {
            // "1.2.x" -> ">=1.2.0, <1.3.0"
            if let (Ok(m), Ok(n)) = (major.parse::<u64>(), minor.parse::<u64>()) {
                return format!(">={m}.{n}.0, <{m}.{}.0", n + 1);
            }
        }
        _ => {}
    }

    // Fallback: just replace x with 0
    range.replace(['x', 'X'], "0")
}
