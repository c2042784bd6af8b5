/// Part paths inside a flat in-memory package.
///
/// Paths are forward-slash separated and stored without a leading slash
/// ("word/document.xml"). A storage view resolves a relative name against
/// its base path by plain concatenation: no `.` or `..` segment is
/// interpreted, callers are expected to pass already sane names.
use crate::error::{Result, StorageError};
use crate::opc::constants::rels;

/// Path of the package-level relationship part.
pub const PACKAGE_RELS_PATH: &str = "_rels/.rels";

/// A normalized part path.
///
/// Provides access to the directory, filename and extension of the path
/// and derives the sibling relationship part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartPath {
    /// The normalized path (e.g., "word/document.xml")
    path: String,
}

impl PartPath {
    /// Create a PartPath, stripping any leading slashes.
    pub fn new<S: AsRef<str>>(path: S) -> Self {
        PartPath {
            path: strip_root(path.as_ref()).to_string(),
        }
    }

    /// Resolve `name` against `base`.
    ///
    /// An empty base is the package root. A name starting with `/` is still
    /// treated as relative to `base`; use [`PartPath::new`] for absolute
    /// paths.
    pub fn resolve(base: &str, name: &str) -> Self {
        let name = strip_root(name);
        let base = base.trim_matches('/');
        if base.is_empty() {
            return Self::new(name);
        }
        let mut path = String::with_capacity(base.len() + 1 + name.len());
        path.push_str(base);
        path.push('/');
        path.push_str(name);
        PartPath { path }
    }

    /// Directory portion, empty for parts at the package root.
    ///
    /// For example, "word" for "word/document.xml".
    pub fn dir(&self) -> &str {
        match memchr::memrchr(b'/', self.path.as_bytes()) {
            Some(pos) => &self.path[..pos],
            None => "",
        }
    }

    /// Filename portion.
    ///
    /// For example, "document.xml" for "word/document.xml".
    pub fn filename(&self) -> &str {
        match memchr::memrchr(b'/', self.path.as_bytes()) {
            Some(pos) => &self.path[pos + 1..],
            None => &self.path,
        }
    }

    /// Path of the relationship part describing this part.
    ///
    /// For example, "word/_rels/document.xml.rels" for "word/document.xml".
    /// Fails for an empty path or a path ending in a slash, which have no
    /// filename to derive from.
    pub fn rels_path(&self) -> Result<PartPath> {
        let filename = self.filename();
        if filename.is_empty() {
            return Err(StorageError::InvalidPath(format!(
                "cannot derive relationship part for '{}'",
                self.path
            )));
        }

        let dir = self.dir();
        let mut path = String::with_capacity(
            dir.len() + rels::DIR_NAME.len() + filename.len() + rels::EXT.len() + 2,
        );
        if !dir.is_empty() {
            path.push_str(dir);
            path.push('/');
        }
        path.push_str(rels::DIR_NAME);
        path.push('/');
        path.push_str(filename);
        path.push_str(rels::EXT);
        Ok(PartPath { path })
    }

    /// Whether this is a relationship part sitting directly in the `_rels`
    /// directory of `base`.
    pub fn is_rels_part_of(&self, base: &str) -> bool {
        let base = base.trim_matches('/');
        let rest = if base.is_empty() {
            self.path.as_str()
        } else {
            match self
                .path
                .strip_prefix(base)
                .and_then(|rest| rest.strip_prefix('/'))
            {
                Some(rest) => rest,
                None => return false,
            }
        };

        rest.strip_prefix(rels::DIR_NAME)
            .and_then(|rest| rest.strip_prefix('/'))
            .is_some_and(|name| !name.contains('/') && name.ends_with(rels::EXT))
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn into_string(self) -> String {
        self.path
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }
}

#[inline]
fn strip_root(path: &str) -> &str {
    path.trim_start_matches('/')
}

impl std::fmt::Display for PartPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path)
    }
}

impl AsRef<str> for PartPath {
    fn as_ref(&self) -> &str {
        &self.path
    }
}

impl From<PartPath> for String {
    fn from(path: PartPath) -> Self {
        path.path
    }
}
