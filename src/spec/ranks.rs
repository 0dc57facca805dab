//! Rank subset selector: `"0-2 5"` => {0, 1, 2, 5}.

use crate::error::RankSetError;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// A set of MPI ranks kept as inclusive ranges; `None` selects every rank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankSet(Option<Vec<RangeInclusive<u32>>>);

impl RankSet {
    pub fn all() -> Self {
        Self(None)
    }

    pub fn contains(&self, rank: u32) -> bool {
        self.0
            .as_ref()
            .is_none_or(|ranges| ranges.iter().any(|r| r.contains(&rank)))
    }
}

impl FromStr for RankSet {
    type Err = RankSetError;

    /// Tokens are separated by whitespace or commas. Each token is a rank or
    /// an inclusive range `a-b`. A blank string selects every rank.
    fn from_str(s: &str) -> Result<Self, RankSetError> {
        let mut ranges = Vec::new();
        for tok in s.split([' ', '\t', ',']).filter(|t| !t.is_empty()) {
            match tok.split_once('-') {
                Some((lo, hi)) => {
                    let lo = parse_rank(lo, tok)?;
                    let hi = parse_rank(hi, tok)?;
                    if lo > hi {
                        return Err(RankSetError::Reversed { lo, hi });
                    }
                    ranges.push(lo..=hi);
                }
                None => {
                    let r = parse_rank(tok, tok)?;
                    ranges.push(r..=r);
                }
            }
        }
        if ranges.is_empty() {
            return Ok(Self::all());
        }
        Ok(Self(Some(ranges)))
    }
}

fn parse_rank(s: &str, tok: &str) -> Result<u32, RankSetError> {
    s.trim()
        .parse()
        .map_err(|_| RankSetError::Invalid(tok.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn members(set: &RankSet, upto: u32) -> Vec<u32> {
        (0..=upto).filter(|r| set.contains(*r)).collect()
    }

    #[test]
    fn ranges_and_singles() {
        let set: RankSet = "0-2 5".parse().unwrap();
        assert_eq!(members(&set, 10), vec![0, 1, 2, 5]);
    }

    #[test]
    fn commas_and_overlaps() {
        let set: RankSet = "4,2-4, 3".parse().unwrap();
        assert_eq!(members(&set, 10), vec![2, 3, 4]);
    }

    #[test]
    fn full_width_range_stays_small() {
        let set: RankSet = "0-4294967295".parse().unwrap();
        assert_eq!(set, RankSet(Some(vec![0..=u32::MAX])));
        assert!(set.contains(0));
        assert!(set.contains(u32::MAX));
    }

    #[test]
    fn blank_selects_everything() {
        let set: RankSet = "  ".parse().unwrap();
        assert_eq!(set, RankSet::all());
        assert!(set.contains(1234));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(
            "3-1".parse::<RankSet>(),
            Err(RankSetError::Reversed { lo: 3, hi: 1 })
        );
        assert_eq!(
            "a-2".parse::<RankSet>(),
            Err(RankSetError::Invalid("a-2".to_string()))
        );
        assert!("1-".parse::<RankSet>().is_err());
    }
}
