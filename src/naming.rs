//! Artifact naming.
//!
//! apt names downloaded files `<package>_<version>_<arch>.<codename>.deb`.
//! The codename and extension are build-host details; everything before
//! them is what the release builder keys off.

/// Strip the last two dot-separated segments from a downloaded filename.
///
/// Purely syntactic. Apply it exactly once, to the filename as apt wrote
/// it: a second application keeps truncating. Inputs with fewer than three
/// segments produce an empty string.
///
/// A version containing a codename-like suffix is not disambiguated; only
/// the final two segments are ever removed.
pub fn derive_full_name(filename: &str) -> String {
    let segments: Vec<&str> = filename.split('.').collect();
    let keep = segments.len().saturating_sub(2);
    segments[..keep].join(".")
}
