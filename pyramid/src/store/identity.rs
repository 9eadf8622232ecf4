use std::io;
use std::path::Path;

/// Comparable handle for the stored object behind a path.
///
/// Two paths have equal identities when they resolve to the same underlying
/// file: hard links share an inode and symbolic links are followed. An
/// independent copy has a different identity even if its bytes match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileIdentity(IdentityKey);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum IdentityKey {
    #[cfg(unix)]
    Node { dev: u64, ino: u64 },
    #[cfg(not(unix))]
    Canonical(std::path::PathBuf),
}

impl TileIdentity {
    #[cfg(unix)]
    pub fn of(path: &Path) -> io::Result<Self> {
        use std::os::unix::fs::MetadataExt;

        let meta = std::fs::metadata(path)?;
        Ok(TileIdentity(IdentityKey::Node {
            dev: meta.dev(),
            ino: meta.ino(),
        }))
    }

    #[cfg(not(unix))]
    pub fn of(path: &Path) -> io::Result<Self> {
        Ok(TileIdentity(IdentityKey::Canonical(std::fs::canonicalize(
            path,
        )?)))
    }
}
