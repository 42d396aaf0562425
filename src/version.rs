use std::cmp::Ordering;

const COMPARED_SEGMENTS: usize = 3;

/// Digits too large for `u64` saturate; anything else non-numeric is zero.
fn parse_segment(part: &str) -> u64 {
    match part.parse() {
        Ok(n) => n,
        Err(_) if !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()) => u64::MAX,
        Err(_) => 0,
    }
}

fn segments(version: &str) -> [u64; COMPARED_SEGMENTS] {
    let mut out = [0; COMPARED_SEGMENTS];
    for (slot, part) in out.iter_mut().zip(version.trim().split('.')) {
        *slot = parse_segment(part.trim());
    }
    out
}

/// Compares two dotted `major.minor.patch` versions numerically.
///
/// Missing or non-numeric segments count as zero and anything past the third
/// segment is ignored, so `1.2` equals `1.2.0` and `1.2.3.9` equals `1.2.3`.
/// Pre-release tags and build metadata are not understood.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    segments(a).cmp(&segments(b))
}

/// `true` when `remote` is strictly newer than `local`.
pub fn is_newer(remote: &str, local: &str) -> bool {
    compare_versions(remote, local) == Ordering::Greater
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_segments_are_zero() {
        assert_eq!(compare_versions("1.2.0", "1.2"), Ordering::Equal);
        assert_eq!(compare_versions("3", "3.0.0"), Ordering::Equal);
    }

    #[test]
    fn first_differing_segment_decides() {
        assert_eq!(compare_versions("2.0.0", "1.9.9"), Ordering::Greater);
        assert_eq!(compare_versions("1.0.1", "1.1.0"), Ordering::Less);
        assert_eq!(compare_versions("1.10.0", "1.9.0"), Ordering::Greater);
    }

    #[test]
    fn fourth_segment_ignored() {
        assert_eq!(compare_versions("1.2.3.9", "1.2.3.1"), Ordering::Equal);
        assert!(!is_newer("1.2.3.9", "1.2.3"));
    }

    #[test]
    fn antisymmetric_and_reflexive() {
        let versions = ["0", "0.0.1", "1", "1.0.1", "1.2", "1.2.3", "2.0.0", "10.4.2", "1.9.9"];
        for a in versions {
            assert_eq!(compare_versions(a, a), Ordering::Equal);
            for b in versions {
                assert_eq!(compare_versions(a, b), compare_versions(b, a).reverse(), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn garbage_segments_parse_as_zero() {
        assert_eq!(compare_versions("1.x.3", "1.0.3"), Ordering::Equal);
        assert!(is_newer("1.4.2", "1.4.1"));
    }

    #[test]
    fn oversized_segments_saturate() {
        assert!(is_newer("1.99999999999999999999", "1.5"));
        assert!(is_newer("1.0.99999999999999999999", "1.0.18446744073709551614"));
        assert_eq!(
            compare_versions("2.99999999999999999999", "2.18446744073709551615"),
            Ordering::Equal
        );
    }
}
