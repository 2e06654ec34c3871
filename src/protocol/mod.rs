//! Voice protocol definitions

mod speaking;

pub use speaking::{SpeakingMode, SpeakingModes, KNOWN_BITS};
