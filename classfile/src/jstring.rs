//! Methods for converting the string format used in the Java Virtual Machine Specification to and from
//! rust strings.
//!
//! See <https://docs.oracle.com/javase/specs/jvms/se22/html/jvms-4.html#jvms-4.4.7> for the complete specification of
//! the string format used in the Java Virtual Machine Specification.

use anyhow::{anyhow, Context, Result};
use java_string::{JavaStr, JavaString};

/// Reads modified utf8 into a rust [`String`].
///
/// Fails for invalid modified utf8 as well as for strings containing unpaired surrogates, which rust strings can't hold.
pub(crate) fn from_slice_to_string(slice: &[u8]) -> Result<String> {
	JavaString::from_modified_utf8(slice.to_vec())
		.with_context(|| anyhow!("invalid java utf8 contents"))?
		.into_string()
		.map_err(|_| anyhow!("java string with unpaired surrogates can't be used as a name: {slice:?}"))
}

/// Takes in a string and writes it out as modified utf8.
pub(crate) fn from_str_to_vec(string: &str) -> Vec<u8> {
	JavaStr::from_str(string).to_modified_utf8().into_owned()
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use crate::jstring::{from_slice_to_string, from_str_to_vec};

	fn round_trip(raw: &[u8], string: &str) -> Result<()> {
		assert_eq!(from_str_to_vec(string), raw);
		assert_eq!(from_slice_to_string(raw)?, string);
		Ok(())
	}

	#[test]
	fn zero() -> Result<()> {
		round_trip(&[0b1100_0000, 0b1000_0000, 0b1100_0000, 0b1000_0000], "\0\0")
	}

	#[test]
	fn ascii_names() -> Result<()> {
		round_trip(b"net/minecraft/unmapped/C_1234$Inner", "net/minecraft/unmapped/C_1234$Inner")
	}

	#[test]
	fn supplementary_plane() -> Result<()> {
		// stored as a surrogate pair, each surrogate taking up three bytes
		round_trip(&[0xed, 0xa0, 0x80, 0xed, 0xb0, 0x80], "\u{10000}")
	}

	#[test]
	fn unpaired_surrogate_is_rejected() {
		assert!(from_slice_to_string(&[0xed, 0xa0, 0x80]).is_err());
	}
}
