// ── Debian package index parsing ──
//
// A `Packages` index is a sequence of RFC 822-style stanzas separated by
// blank lines. Continuation lines (leading whitespace) belong to the
// previous field and are irrelevant for lookups, so they are skipped.

use std::collections::HashMap;

/// One stanza of a `Packages` index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageStanza {
    fields: HashMap<String, String>,
}

impl PackageStanza {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn package(&self) -> Option<&str> {
        self.get("Package")
    }

    pub fn version(&self) -> Option<&str> {
        self.get("Version")
    }

    /// Archive-relative path of the `.deb`.
    pub fn filename(&self) -> Option<&str> {
        self.get("Filename")
    }

    pub fn sha256(&self) -> Option<&str> {
        self.get("SHA256")
    }
}

/// Parse a full `Packages` index into stanzas.
pub fn parse_index(text: &str) -> Vec<PackageStanza> {
    let mut stanzas = Vec::new();
    let mut current = PackageStanza::default();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.fields.is_empty() {
                stanzas.push(std::mem::take(&mut current));
            }
            continue;
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            current
                .fields
                .insert(key.trim().to_owned(), value.trim().to_owned());
        }
    }
    if !current.fields.is_empty() {
        stanzas.push(current);
    }
    stanzas
}

/// Find the stanza for `package`. When the index lists several versions,
/// the last one wins, matching how the archive appends newer uploads.
pub fn find_package<'a>(stanzas: &'a [PackageStanza], package: &str) -> Option<&'a PackageStanza> {
    stanzas
        .iter()
        .rev()
        .find(|stanza| stanza.package() == Some(package))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const INDEX: &str = "\
Package: grub-efi-arm64-bin
Architecture: arm64
Version: 2.12-1ubuntu7
Filename: pool/main/g/grub2/grub-efi-arm64-bin_2.12-1ubuntu7_arm64.deb
Size: 1024
SHA256: 00ff
Description: GRand Unified Bootloader, version 2 (ARM64 UEFI modules)
 GRUB is a portable, powerful bootloader.
 .
 This package contains GRUB modules.

Package: grub-common
Version: 2.12-1ubuntu7
Filename: pool/main/g/grub2/grub-common_2.12-1ubuntu7_arm64.deb
";

    #[test]
    fn parses_every_stanza() {
        let stanzas = parse_index(INDEX);
        assert_eq!(stanzas.len(), 2);
        assert_eq!(stanzas[1].package(), Some("grub-common"));
    }

    #[test]
    fn continuation_lines_do_not_become_fields() {
        let stanzas = parse_index(INDEX);
        assert_eq!(
            stanzas[0].get("Description"),
            Some("GRand Unified Bootloader, version 2 (ARM64 UEFI modules)")
        );
        assert!(stanzas[0].get("GRUB is a portable, powerful bootloader.").is_none());
    }

    #[test]
    fn finds_package_filename_and_checksum() {
        let stanzas = parse_index(INDEX);
        let grub = find_package(&stanzas, "grub-efi-arm64-bin").unwrap();
        assert_eq!(
            grub.filename(),
            Some("pool/main/g/grub2/grub-efi-arm64-bin_2.12-1ubuntu7_arm64.deb")
        );
        assert_eq!(grub.sha256(), Some("00ff"));
        assert_eq!(grub.version(), Some("2.12-1ubuntu7"));
    }

    #[test]
    fn last_listed_version_wins() {
        let index = "Package: a\nVersion: 1\n\nPackage: a\nVersion: 2\n";
        let stanzas = parse_index(index);
        assert_eq!(find_package(&stanzas, "a").unwrap().version(), Some("2"));
    }

    #[test]
    fn unknown_package_is_none() {
        let stanzas = parse_index(INDEX);
        assert!(find_package(&stanzas, "shim-signed").is_none());
    }
}
