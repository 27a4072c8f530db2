//! Compact, roughly time-ordered string ids.
//!
//! An id is `{time part}{fixed part}{random part}`: milliseconds since
//! 2000-01-01 UTC encoded in a base-55 alphabet and padded to eight
//! characters, an optional fixed infix, and random characters drawn from the
//! same alphabet. The alphabet is ASCII-ascending, so ids generated later
//! sort lexicographically after earlier ones.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::CryptoError;
use crate::random::CryptoRandom;

/// Base-55 alphabet with visually ambiguous characters removed.
const CHARSET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghjkmnpqrstuvwxyz";
const TIME_PART_LEN: usize = 8;
const DEFAULT_RANDOM_PART_LEN: usize = 6;
const MIN_RANDOM_PART_LEN: usize = 4;
const MAX_RANDOM_PART_LEN: usize = 100;
/// 2000-01-01T00:00:00Z in seconds since the Unix epoch.
const ORIGIN_UNIX_SECONDS: u64 = 946_684_800;

pub struct IdGenerator {
    fixed_part: String,
    random_part_length: usize,
    add_hyphens: bool,
    rng: CryptoRandom,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            fixed_part: String::new(),
            random_part_length: DEFAULT_RANDOM_PART_LEN,
            add_hyphens: false,
            rng: CryptoRandom::new(),
        }
    }

    /// Fixed infix between the time and random parts, for tagging ids with
    /// their origin (node name, tenant, ...). Surrounding whitespace is
    /// trimmed.
    pub fn with_fixed_part(fixed_part: &str) -> Self {
        let mut generator = Self::new();
        generator.fixed_part = fixed_part.trim().to_string();
        generator
    }

    /// Random part length, between 4 and 100 characters.
    pub fn random_part_length(mut self, length: usize) -> Result<Self, CryptoError> {
        if !(MIN_RANDOM_PART_LEN..=MAX_RANDOM_PART_LEN).contains(&length) {
            return Err(CryptoError::InvalidArgument(format!(
                "random part length must be between {MIN_RANDOM_PART_LEN} and \
                 {MAX_RANDOM_PART_LEN}, got {length}"
            )));
        }
        self.random_part_length = length;
        Ok(self)
    }

    /// Separate the parts with hyphens.
    pub fn add_hyphens(mut self, add: bool) -> Self {
        self.add_hyphens = add;
        self
    }

    pub fn new_id(&self) -> String {
        self.new_id_at(SystemTime::now())
    }

    /// Id for a specific instant. Ids for the same millisecond share a time
    /// part; instants before the year-2000 origin clamp to it.
    pub fn new_id_at(&self, time: SystemTime) -> String {
        let unix_millis = time
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_millis();
        let since_origin =
            unix_millis.saturating_sub(u128::from(ORIGIN_UNIX_SECONDS) * 1000) as u64;

        let time_part = to_base55(since_origin, TIME_PART_LEN);
        let random_part = self.random_part();
        if self.add_hyphens {
            if self.fixed_part.is_empty() {
                format!("{time_part}-{random_part}")
            } else {
                format!("{time_part}-{}-{random_part}", self.fixed_part)
            }
        } else {
            format!("{time_part}{}{random_part}", self.fixed_part)
        }
    }

    fn random_part(&self) -> String {
        (0..self.random_part_length)
            .map(|_| {
                let index = self.rng.next_u32_below(CHARSET.len() as u32) as usize;
                CHARSET[index] as char
            })
            .collect()
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn to_base55(mut value: u64, pad: usize) -> String {
    let base = CHARSET.len() as u64;
    let mut digits: Vec<char> = Vec::new();
    loop {
        digits.push(CHARSET[(value % base) as usize] as char);
        value /= base;
        if value == 0 {
            break;
        }
    }
    while digits.len() < pad {
        digits.push(CHARSET[0] as char);
    }
    digits.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn charset_only(s: &str) -> bool {
        s.bytes().all(|b| CHARSET.contains(&b))
    }

    #[test]
    fn default_id_shape() {
        let id = IdGenerator::new().new_id();
        assert_eq!(id.len(), TIME_PART_LEN + DEFAULT_RANDOM_PART_LEN);
        assert!(charset_only(&id));
    }

    #[test]
    fn fixed_part_sits_between_time_and_random() {
        let time = UNIX_EPOCH + Duration::from_secs(ORIGIN_UNIX_SECONDS + 1_000_000);
        let generator = IdGenerator::with_fixed_part("node7");
        let id = generator.new_id_at(time);
        assert_eq!(&id[TIME_PART_LEN..TIME_PART_LEN + 5], "node7");

        let hyphenated = IdGenerator::with_fixed_part("node7")
            .add_hyphens(true)
            .new_id_at(time);
        assert_eq!(hyphenated.matches('-').count(), 2);
        assert_eq!(hyphenated.split('-').nth(1), Some("node7"));
    }

    #[test]
    fn hyphens_without_fixed_part() {
        let id = IdGenerator::new().add_hyphens(true).new_id();
        assert_eq!(id.matches('-').count(), 1);
    }

    #[test]
    fn time_parts_sort_chronologically() {
        let generator = IdGenerator::new();
        let earlier = UNIX_EPOCH + Duration::from_secs(ORIGIN_UNIX_SECONDS + 10);
        let later = UNIX_EPOCH + Duration::from_secs(ORIGIN_UNIX_SECONDS + 86_400);
        let a = generator.new_id_at(earlier);
        let b = generator.new_id_at(later);
        assert!(&a[..TIME_PART_LEN] < &b[..TIME_PART_LEN]);
    }

    #[test]
    fn same_instant_shares_a_time_part() {
        let generator = IdGenerator::new();
        let time = UNIX_EPOCH + Duration::from_secs(ORIGIN_UNIX_SECONDS + 12_345);
        let a = generator.new_id_at(time);
        let b = generator.new_id_at(time);
        assert_eq!(a[..TIME_PART_LEN], b[..TIME_PART_LEN]);
        assert_ne!(a[TIME_PART_LEN..], b[TIME_PART_LEN..]);
    }

    #[test]
    fn pre_origin_times_clamp() {
        let id = IdGenerator::new().new_id_at(UNIX_EPOCH);
        assert_eq!(&id[..TIME_PART_LEN], "22222222");
    }

    #[test]
    fn random_part_length_is_bounded() {
        assert!(IdGenerator::new().random_part_length(3).is_err());
        assert!(IdGenerator::new().random_part_length(101).is_err());
        let id = IdGenerator::new()
            .random_part_length(10)
            .unwrap()
            .new_id();
        assert_eq!(id.len(), TIME_PART_LEN + 10);
    }

    #[test]
    fn base55_encodes_and_pads() {
        assert_eq!(to_base55(0, 8), "22222222");
        assert_eq!(to_base55(54, 1), "z");
        assert_eq!(to_base55(55, 2), "32");
        assert_eq!(to_base55(55, 4), "2232");
    }
}
