//! Binary blobs referenced by reflected fields

/// Raw bytes stored in a file next to the owning object
///
/// `path` is relative to the root of the package or level the object belongs
/// to. Only the path is written into the object container; the bytes live
/// in their own file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Buffer {
    pub path: String,
    pub data: Vec<u8>,
}

impl Buffer {
    pub fn new(path: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    /// Check if the buffer points at no file
    pub fn is_unset(&self) -> bool {
        self.path.is_empty()
    }
}
