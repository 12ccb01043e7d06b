//! Sorting jar entries into what needs remapping and what doesn't.

/// What a jar entry is, judged by its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind<'a> {
	/// A class file, with the class name it's stored under.
	Class(&'a str),
	Manifest,
	/// A signature block file, like `META-INF/CERT.RSA`. These are invalid once classes change.
	Signature,
	Directory,
	Other,
}

impl<'a> EntryKind<'a> {
	pub fn of(name: &'a str) -> EntryKind<'a> {
		if name.ends_with('/') {
			return EntryKind::Directory;
		}
		if let Some(class) = name.strip_suffix(".class") {
			return EntryKind::Class(class);
		}
		if name.ends_with("MANIFEST.MF") {
			return EntryKind::Manifest;
		}
		if let Some(file) = name.strip_prefix("META-INF/") {
			let signature = [".SF", ".RSA", ".DSA", ".EC"].iter().any(|suffix| file.ends_with(suffix));
			if signature && !file.contains('/') {
				return EntryKind::Signature;
			}
		}
		EntryKind::Other
	}
}

/// Splits off the first line, returning it and the length of its line terminator.
fn split_line(bytes: &[u8]) -> (&[u8], usize) {
	match bytes.iter().position(|&b| b == b'\r' || b == b'\n') {
		Some(i) if bytes[i] == b'\r' && bytes.get(i + 1) == Some(&b'\n') => (&bytes[..i], 2),
		Some(i) => (&bytes[..i], 1),
		None => (bytes, 0),
	}
}

/// Keeps only the main section of a manifest.
///
/// The per entry sections carry the digests of signed jars, which are wrong for the remapped classes.
/// ```
/// let manifest = b"Manifest-Version: 1.0\r\nMain-Class: a\r\n\r\nName: a.class\r\nSHA-256-Digest: AAAA\r\n\r\n";
/// let stripped = remapper::jar::strip_manifest(manifest);
/// assert_eq!(stripped, b"Manifest-Version: 1.0\r\nMain-Class: a\r\n\r\n");
/// ```
pub fn strip_manifest(manifest: &[u8]) -> Vec<u8> {
	let mut stripped = Vec::with_capacity(manifest.len());

	let mut rest = manifest;
	while !rest.is_empty() {
		let (line, terminator) = split_line(rest);
		let (line_with_terminator, after) = rest.split_at(line.len() + terminator);
		stripped.extend_from_slice(line_with_terminator);

		// the first empty line ends the main section
		if line.is_empty() {
			break;
		}
		rest = after;
	}

	stripped
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use crate::jar::{strip_manifest, EntryKind};

	#[test]
	fn kinds() {
		assert_eq!(EntryKind::of("a.class"), EntryKind::Class("a"));
		assert_eq!(EntryKind::of("net/minecraft/Apple$Seed.class"), EntryKind::Class("net/minecraft/Apple$Seed"));
		assert_eq!(EntryKind::of("META-INF/MANIFEST.MF"), EntryKind::Manifest);
		assert_eq!(EntryKind::of("META-INF/MOJANGCS.SF"), EntryKind::Signature);
		assert_eq!(EntryKind::of("META-INF/MOJANGCS.RSA"), EntryKind::Signature);
		assert_eq!(EntryKind::of("META-INF/services/a.SF"), EntryKind::Other);
		assert_eq!(EntryKind::of("META-INF/"), EntryKind::Directory);
		assert_eq!(EntryKind::of("pack.png"), EntryKind::Other);
	}

	#[test]
	fn manifest_without_sections() {
		let manifest = b"Manifest-Version: 1.0\nMain-Class: a\n";
		assert_eq!(strip_manifest(manifest), manifest.to_vec());
	}

	#[test]
	fn manifest_with_sections() {
		let manifest = b"Manifest-Version: 1.0\n\nName: a.class\nSHA-256-Digest: AAAA\n";
		assert_eq!(strip_manifest(manifest), b"Manifest-Version: 1.0\n\n".to_vec());

		let manifest = b"Manifest-Version: 1.0\r\rName: a.class\r";
		assert_eq!(strip_manifest(manifest), b"Manifest-Version: 1.0\r\r".to_vec());
	}
}
