//! # Rekit Header
//!
//! Some dumps carry a copier or emulator header in front of the data a
//! catalog describes. A [`Skipper`] recognises such a header from the first
//! bytes of a file and a [`Rule`] strips it, so the remaining payload can be
//! hashed and matched.
//!
//! ```
//! use rekit_header::SkipperSet;
//!
//! let skippers = SkipperSet::builtin();
//! let mut rom = b"NES\x1a\x02\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00".to_vec();
//! rom.extend_from_slice(b"PRG data");
//!
//! let rule = skippers.match_rule(&rom, rom.len() as u64, "nes.xml").unwrap();
//! let mut stripped = Vec::new();
//! rule.transform(&rom[..], &mut stripped).unwrap();
//! assert_eq!(stripped, b"PRG data");
//! ```

pub mod error;
mod rule;
mod skipper;

pub use crate::error::{Error, ErrorKind, Result};
pub use crate::rule::{Rule, SizeOp, Test};
pub use crate::skipper::{Skipper, SkipperSet};
