use crate::error::ConfigError;

/// Upper bound on `sets * ways`, keeps line metadata allocations within a few GiB.
pub const MAX_LINES: u128 = 1 << 26;

/// Validated shape of a simulated cache.
///
/// - `sets`: number of sets, `2^set_bits`
/// - `ways`: number of cache-lines in a set
/// - `block_size`: number of bytes in a cache-line, `2^block_bits`
///
/// Only constructible through [`Geometry::new`] or [`Geometry::from_bits`],
/// so every `Geometry` in existence describes a well-defined address split.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Geometry {
    set_bits: u32,
    ways: usize,
    block_bits: u32,
}

impl Geometry {
    pub fn new(sets: usize, ways: usize, block_size: usize) -> Result<Self, ConfigError> {
        fn exponent(parameter: &'static str, value: usize) -> Result<u32, ConfigError> {
            if value == 0 {
                return Err(ConfigError::NotPositive { parameter });
            }
            if !value.is_power_of_two() {
                return Err(ConfigError::NotPowerOfTwo { parameter, value });
            }
            Ok(value.trailing_zeros())
        }

        Self::from_bits(
            exponent("number of sets", sets)?,
            ways,
            exponent("block size", block_size)?,
        )
    }

    pub fn from_bits(set_bits: u32, ways: usize, block_bits: u32) -> Result<Self, ConfigError> {
        if ways == 0 {
            return Err(ConfigError::NotPositive {
                parameter: "lines per set",
            });
        }

        // both shifts in decompose must stay within a 64-bit address
        if block_bits >= u64::BITS
            || set_bits
                .checked_add(block_bits)
                .is_none_or(|bits| bits > u64::BITS)
        {
            return Err(ConfigError::AddressTooNarrow {
                set_bits,
                block_bits,
            });
        }

        let lines = (1u128 << set_bits).saturating_mul(ways as u128);
        if lines > MAX_LINES {
            return Err(ConfigError::TooLarge { lines });
        }

        Ok(Self {
            set_bits,
            ways,
            block_bits,
        })
    }

    pub fn sets(&self) -> usize {
        1 << self.set_bits
    }

    pub fn ways(&self) -> usize {
        self.ways
    }

    pub fn block_size(&self) -> u64 {
        1 << self.block_bits
    }

    /// Splits an address into `(set_index, tag)`; the block offset is dropped.
    pub fn decompose(&self, address: u64) -> (usize, u64) {
        let set_index_mask = !(!0u64 << self.set_bits);
        let set_index = address.checked_shr(self.block_bits).unwrap_or(0) & set_index_mask;
        let tag = address
            .checked_shr(self.set_bits + self.block_bits)
            .unwrap_or(0);

        (set_index as usize, tag)
    }

    pub fn format_info(&self) -> String {
        let total = (self.sets() as u128) * (self.ways as u128) * u128::from(self.block_size());
        [
            "LRU Cache:".to_string(),
            format!("\tTotal Size: {total}B"),
            format!("\tSets: {}", self.sets()),
            format!("\tWays: {}", self.ways),
            format!("\tLine-Size: {}B", self.block_size()),
            format!(
                "\t| {} tag bits | {} set bits | {} offset bits |",
                u64::BITS - (self.set_bits + self.block_bits),
                self.set_bits,
                self.block_bits
            ),
        ]
        .join("\n")
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CacheHit {
    Hit,
    /// `evicted` holds the tag of the replaced line, `None` if an invalid line was filled
    Miss { evicted: Option<u64> },
}

impl CacheHit {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheHit::Hit)
    }

    pub fn is_eviction(&self) -> bool {
        matches!(self, CacheHit::Miss { evicted: Some(_) })
    }
}

impl std::fmt::Display for CacheHit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheHit::Hit => f.write_str("hit"),
            CacheHit::Miss { evicted: None } => f.write_str("miss"),
            CacheHit::Miss { evicted: Some(_) } => f.write_str("miss eviction"),
        }
    }
}

/// A cache the simulator can replay accesses against.
pub trait CacheModel {
    fn geometry(&self) -> &Geometry;

    /// Performs one access to `address` and updates the line metadata of the addressed set.
    fn access(&mut self, address: u64) -> CacheHit;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_bad_geometry() {
        assert_eq!(
            Geometry::new(0, 1, 1),
            Err(ConfigError::NotPositive {
                parameter: "number of sets"
            })
        );
        assert_eq!(
            Geometry::new(3, 1, 1),
            Err(ConfigError::NotPowerOfTwo {
                parameter: "number of sets",
                value: 3
            })
        );
        assert_eq!(
            Geometry::new(4, 1, 12),
            Err(ConfigError::NotPowerOfTwo {
                parameter: "block size",
                value: 12
            })
        );
        assert_eq!(
            Geometry::new(4, 0, 16),
            Err(ConfigError::NotPositive {
                parameter: "lines per set"
            })
        );
        assert_eq!(
            Geometry::from_bits(40, 1, 30),
            Err(ConfigError::AddressTooNarrow {
                set_bits: 40,
                block_bits: 30
            })
        );
    }

    #[test]
    fn rejects_offset_and_index_overflow() {
        // a 2^64 byte block does not fit the address
        assert_eq!(
            Geometry::from_bits(0, 1, 64),
            Err(ConfigError::AddressTooNarrow {
                set_bits: 0,
                block_bits: 64
            })
        );
        assert_eq!(
            Geometry::from_bits(1, 1, u32::MAX),
            Err(ConfigError::AddressTooNarrow {
                set_bits: 1,
                block_bits: u32::MAX
            })
        );
        assert_eq!(
            Geometry::from_bits(u32::MAX, 1, 1),
            Err(ConfigError::AddressTooNarrow {
                set_bits: u32::MAX,
                block_bits: 1
            })
        );

        // largest block still works
        let geometry = Geometry::from_bits(0, 1, 63).unwrap();
        assert_eq!(geometry.block_size(), 1 << 63);
        assert!(geometry.format_info().contains("| 1 tag bits | 0 set bits | 63 offset bits |"));
    }

    #[test]
    fn rejects_oversized_caches() {
        assert_eq!(
            Geometry::from_bits(40, 1, 4),
            Err(ConfigError::TooLarge { lines: 1 << 40 })
        );
        assert_eq!(
            Geometry::from_bits(20, 1 << 10, 4),
            Err(ConfigError::TooLarge { lines: 1 << 30 })
        );
        assert_eq!(
            Geometry::from_bits(1, usize::MAX, 4),
            Err(ConfigError::TooLarge {
                lines: 2 * usize::MAX as u128
            })
        );
        assert!(Geometry::from_bits(16, 1 << 10, 4).is_ok());
    }

    #[test]
    fn from_bits_matches_new() {
        let geometry = Geometry::from_bits(4, 2, 5).unwrap();
        assert_eq!(geometry, Geometry::new(16, 2, 32).unwrap());
        assert_eq!(geometry.sets(), 16);
        assert_eq!(geometry.block_size(), 32);
    }

    #[test]
    fn decompose_matches_division() {
        let geometry = Geometry::new(16, 1, 32).unwrap();
        for address in [0u64, 1, 31, 32, 511, 512, 0x7ff0_005c_8, u64::MAX] {
            let block = address / geometry.block_size();
            let expected = ((block % 16) as usize, block / 16);
            assert_eq!(geometry.decompose(address), expected, "address {address:#X}");
        }
    }

    #[test]
    fn decompose_full_width() {
        // no tag bits left at all
        let geometry = Geometry::from_bits(20, 1, 44).unwrap();
        assert_eq!(geometry.decompose(u64::MAX), ((1 << 20) - 1, 0));

        let geometry = Geometry::from_bits(0, 1, 0).unwrap();
        assert_eq!(geometry.decompose(0xdead_beef), (0, 0xdead_beef));
    }
}
