//! Speaking state flags for voice-activity messages
//!
//! The voice protocol carries a single integer per speaking update:
//! - bit 0: VOICE (1)
//! - bit 1: SOUNDSHARE (2)
//! - bit 2: PRIORITY (4)
//!
//! Remaining bits are reserved and ignored on decode.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Mask of all bits this protocol version understands
pub const KNOWN_BITS: i32 = 0b111;

/// A single speaking mode flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum SpeakingMode {
    /// Normal transmission of voice audio
    Voice = 1,
    /// Transmission of context audio for video, no speaking indicator
    Soundshare = 2,
    /// Priority speaker, lowering audio of other speakers
    Priority = 4,
}

impl SpeakingMode {
    /// All modes in weight order
    pub const ALL: [SpeakingMode; 3] = [Self::Voice, Self::Soundshare, Self::Priority];

    /// The raw bitmask for this mode
    pub fn raw(self) -> i32 {
        self as i32
    }

    /// Protocol name of the mode
    pub fn name(self) -> &'static str {
        match self {
            Self::Voice => "VOICE",
            Self::Soundshare => "SOUNDSHARE",
            Self::Priority => "PRIORITY",
        }
    }
}

impl fmt::Display for SpeakingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SpeakingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    "Unknown speaking mode: {}. Valid values are voice, soundshare, priority",
                    s
                )
            })
    }
}

/// Set of active speaking modes
///
/// Only known flags can be stored, so the set always encodes back to a
/// mask within [`KNOWN_BITS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub struct SpeakingModes {
    bits: u8,
}

impl SpeakingModes {
    /// Set with no modes
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    /// Set with every known mode
    pub const fn all() -> Self {
        Self {
            bits: KNOWN_BITS as u8,
        }
    }

    /// Parse the active modes represented by a raw bitmask
    ///
    /// Never fails: reserved bits and negative values are treated as an
    /// opaque bit pattern and only known flags are picked out.
    pub fn from_raw(mask: i32) -> Self {
        let mut modes = Self::empty();
        if mask == 0 {
            return modes;
        }
        for mode in SpeakingMode::ALL {
            if mask & mode.raw() == mode.raw() {
                modes.insert(mode);
            }
        }
        modes
    }

    /// Convert modes into the raw bitmask sent in speaking updates
    ///
    /// Accepts a single mode, an array or slice of modes, a set, or
    /// `None`. Absent and empty input both encode to 0.
    pub fn encode(modes: impl Into<SpeakingModes>) -> i32 {
        modes.into().raw()
    }

    /// The raw bitmask for this set
    pub fn raw(self) -> i32 {
        i32::from(self.bits)
    }

    pub fn contains(self, mode: SpeakingMode) -> bool {
        self.bits & mode as u8 != 0
    }

    pub fn insert(&mut self, mode: SpeakingMode) {
        self.bits |= mode as u8;
    }

    pub fn remove(&mut self, mode: SpeakingMode) {
        self.bits &= !(mode as u8);
    }

    pub fn is_empty(self) -> bool {
        self.bits == 0
    }

    pub fn len(self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Iterate the contained modes in weight order
    pub fn iter(self) -> impl Iterator<Item = SpeakingMode> {
        SpeakingMode::ALL
            .into_iter()
            .filter(move |mode| self.contains(*mode))
    }
}

impl From<SpeakingMode> for SpeakingModes {
    fn from(mode: SpeakingMode) -> Self {
        Self { bits: mode as u8 }
    }
}

impl From<Option<SpeakingModes>> for SpeakingModes {
    fn from(modes: Option<SpeakingModes>) -> Self {
        modes.unwrap_or_default()
    }
}

impl<const N: usize> From<[SpeakingMode; N]> for SpeakingModes {
    fn from(modes: [SpeakingMode; N]) -> Self {
        modes.into_iter().collect()
    }
}

impl From<&[SpeakingMode]> for SpeakingModes {
    fn from(modes: &[SpeakingMode]) -> Self {
        modes.iter().copied().collect()
    }
}

impl From<i32> for SpeakingModes {
    fn from(mask: i32) -> Self {
        Self::from_raw(mask)
    }
}

impl From<SpeakingModes> for i32 {
    fn from(modes: SpeakingModes) -> Self {
        modes.raw()
    }
}

impl FromIterator<SpeakingMode> for SpeakingModes {
    fn from_iter<I: IntoIterator<Item = SpeakingMode>>(iter: I) -> Self {
        let mut modes = Self::empty();
        for mode in iter {
            modes.insert(mode);
        }
        modes
    }
}

impl BitOr for SpeakingMode {
    type Output = SpeakingModes;

    fn bitor(self, rhs: Self) -> SpeakingModes {
        SpeakingModes::from(self) | rhs
    }
}

impl<T: Into<SpeakingModes>> BitOr<T> for SpeakingModes {
    type Output = SpeakingModes;

    fn bitor(self, rhs: T) -> SpeakingModes {
        Self {
            bits: self.bits | rhs.into().bits,
        }
    }
}

impl<T: Into<SpeakingModes>> BitOrAssign<T> for SpeakingModes {
    fn bitor_assign(&mut self, rhs: T) {
        self.bits |= rhs.into().bits;
    }
}

impl fmt::Display for SpeakingModes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        for (i, mode) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            f.write_str(mode.name())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_zero_is_empty() {
        assert!(SpeakingModes::from_raw(0).is_empty());
    }

    #[test]
    fn test_decode_all_known_bits() {
        let modes = SpeakingModes::from_raw(7);
        assert_eq!(modes.len(), 3);
        assert!(modes.contains(SpeakingMode::Voice));
        assert!(modes.contains(SpeakingMode::Soundshare));
        assert!(modes.contains(SpeakingMode::Priority));
    }

    #[test]
    fn test_decode_voice_priority() {
        let modes = SpeakingModes::from_raw(5);
        assert_eq!(modes, SpeakingMode::Voice | SpeakingMode::Priority);
        assert!(!modes.contains(SpeakingMode::Soundshare));
    }

    #[test]
    fn test_decode_ignores_reserved_bits() {
        let modes = SpeakingModes::from_raw(0b1000 | 0b0010);
        assert_eq!(modes, SpeakingModes::from(SpeakingMode::Soundshare));
        assert!(SpeakingModes::from_raw(0b1000).is_empty());
    }

    #[test]
    fn test_decode_negative_mask() {
        assert_eq!(SpeakingModes::from_raw(-1), SpeakingModes::all());
        assert_eq!(SpeakingModes::from_raw(i32::MIN), SpeakingModes::empty());
    }

    #[test]
    fn test_known_bits_survive_roundtrip() {
        for mask in [-1, 0, 1, 2, 3, 4, 5, 6, 7, 8, 13, 255, 0x7ff0_0003, i32::MIN, i32::MAX] {
            let encoded = SpeakingModes::encode(SpeakingModes::from_raw(mask));
            assert_eq!(encoded & KNOWN_BITS, mask & KNOWN_BITS, "mask {}", mask);
        }
    }

    #[test]
    fn test_encode_absent_and_empty() {
        assert_eq!(SpeakingModes::encode(None::<SpeakingModes>), 0);
        assert_eq!(SpeakingModes::encode(SpeakingModes::empty()), 0);
        assert_eq!(SpeakingModes::encode([] as [SpeakingMode; 0]), 0);
    }

    #[test]
    fn test_encode_variants() {
        assert_eq!(SpeakingModes::encode(SpeakingMode::Priority), 4);
        assert_eq!(
            SpeakingModes::encode([SpeakingMode::Voice, SpeakingMode::Soundshare]),
            3
        );
        // Duplicates collapse
        let slice: &[SpeakingMode] = &[SpeakingMode::Voice, SpeakingMode::Voice];
        assert_eq!(SpeakingModes::encode(slice), 1);
        assert_eq!(SpeakingModes::encode(Some(SpeakingModes::all())), 7);
    }

    #[test]
    fn test_insert_remove() {
        let mut modes = SpeakingModes::empty();
        modes.insert(SpeakingMode::Priority);
        modes |= SpeakingMode::Voice;
        assert_eq!(modes.raw(), 5);
        modes.remove(SpeakingMode::Priority);
        assert_eq!(modes.raw(), 1);
    }

    #[test]
    fn test_iter_in_weight_order() {
        let modes: Vec<_> = SpeakingModes::from_raw(6).iter().collect();
        assert_eq!(modes, vec![SpeakingMode::Soundshare, SpeakingMode::Priority]);
    }

    #[test]
    fn test_display() {
        assert_eq!(SpeakingModes::empty().to_string(), "NONE");
        assert_eq!(SpeakingModes::from_raw(5).to_string(), "VOICE|PRIORITY");
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("voice".parse::<SpeakingMode>(), Ok(SpeakingMode::Voice));
        assert_eq!("SoundShare".parse::<SpeakingMode>(), Ok(SpeakingMode::Soundshare));
        assert!("video".parse::<SpeakingMode>().is_err());
    }

    #[test]
    fn test_serde_uses_raw_mask() {
        let json = serde_json::to_string(&SpeakingModes::from_raw(3)).unwrap();
        assert_eq!(json, "3");
        let modes: SpeakingModes = serde_json::from_str("12").unwrap();
        assert_eq!(modes, SpeakingModes::from(SpeakingMode::Priority));
    }
}
