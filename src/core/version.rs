use std::cmp::Ordering;

use crate::core::error::{UpdateError, UpdateResult};

/// Compare two dotted version strings segment by segment.
///
/// Segments are compared numerically, left to right. A missing segment
/// counts as 0, so `"1.2"` and `"1.2.0"` are equal. A non-numeric segment
/// is an `InvalidVersionFormat` error.
pub fn compare_versions(a: &str, b: &str) -> UpdateResult<Ordering> {
    let left = parse_segments(a)?;
    let right = parse_segments(b)?;

    let len = left.len().max(right.len());
    for i in 0..len {
        let l = left.get(i).copied().unwrap_or(0);
        let r = right.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => continue,
            other => return Ok(other),
        }
    }

    Ok(Ordering::Equal)
}

/// `true` when `candidate` is strictly newer than `current`.
///
/// Malformed input on either side is treated as "not newer" — an update
/// check must never fail because the server advertised a garbage version.
pub fn is_newer(candidate: &str, current: &str) -> bool {
    match compare_versions(candidate, current) {
        Ok(Ordering::Greater) => true,
        Ok(_) => false,
        Err(e) => {
            tracing::warn!("Unparseable version in comparison: {e}");
            false
        }
    }
}

fn parse_segments(version: &str) -> UpdateResult<Vec<u64>> {
    version
        .split('.')
        .map(|seg| {
            seg.trim()
                .parse::<u64>()
                .map_err(|_| UpdateError::InvalidVersionFormat(version.to_string()))
        })
        .collect()
}
