//! Dotted-numeric version comparison
//!
//! Compares versions component-wise as integers; the shorter version is
//! treated as zero-padded, so "0.18" == "0.18.0". Non-numeric components
//! compare as 0.

use std::cmp::Ordering;

/// Compare two dotted version strings.
pub fn vercmp(a: &str, b: &str) -> Ordering {
    let av: Vec<u64> = a.split('.').map(parse_component).collect();
    let bv: Vec<u64> = b.split('.').map(parse_component).collect();

    let len = av.len().max(bv.len());
    for i in 0..len {
        let x = av.get(i).copied().unwrap_or(0);
        let y = bv.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

fn parse_component(s: &str) -> u64 {
    s.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_ordering() {
        assert_eq!(vercmp("0.18.1", "0.18.0"), Ordering::Greater);
        assert_eq!(vercmp("0.17.3", "0.18.0"), Ordering::Less);
        assert_eq!(vercmp("0.18.1", "0.18.1"), Ordering::Equal);
        assert_eq!(vercmp("1.0.0", "0.99.99"), Ordering::Greater);
    }

    #[test]
    fn test_zero_padding() {
        assert_eq!(vercmp("0.18", "0.18.0"), Ordering::Equal);
        assert_eq!(vercmp("0.18", "0.18.0.0"), Ordering::Equal);
        assert_eq!(vercmp("0.18", "0.18.1"), Ordering::Less);
        assert_eq!(vercmp("0.18.1", "0.18"), Ordering::Greater);
    }

    #[test]
    fn test_non_numeric_components_compare_as_zero() {
        assert_eq!(vercmp("0.x.1", "0.0.1"), Ordering::Equal);
        assert_eq!(vercmp("abc", "0"), Ordering::Equal);
    }

    #[test]
    fn test_trichotomy() {
        let versions = ["0.17.0", "0.17.1", "0.18", "0.18.0", "0.18.1", "1.0"];
        for a in versions {
            for b in versions {
                let ab = vercmp(a, b);
                let ba = vercmp(b, a);
                assert_eq!(ab, ba.reverse(), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn test_transitivity() {
        let versions = ["0.16.9", "0.17.0", "0.17.10", "0.18.0", "0.18.1"];
        for a in versions {
            for b in versions {
                for c in versions {
                    if vercmp(a, b) == Ordering::Less && vercmp(b, c) == Ordering::Less {
                        assert_eq!(vercmp(a, c), Ordering::Less, "{a} < {b} < {c}");
                    }
                }
            }
        }
    }

}
