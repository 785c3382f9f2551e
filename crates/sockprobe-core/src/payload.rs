//! Fixed test message.

/// The message every run transfers unless told otherwise.
pub const DEFAULT_PAYLOAD: &[u8] = b"welcome to the machine";

/// Immutable test payload. Its length is fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadSpec {
    bytes: Box<[u8]>,
}

impl PayloadSpec {
    /// Build a payload. Returns `None` for an empty message, which would
    /// make every completion target degenerate.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Option<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return None;
        }
        Some(Self {
            bytes: bytes.into_boxed_slice(),
        })
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Fill `dst` with the payload repeated as a continuous stream that
    /// starts `offset` bytes into the repetition.
    pub fn fill_stream(&self, offset: u64, dst: &mut [u8]) {
        let len = self.bytes.len() as u64;
        let mut pos = (offset % len) as usize;
        for slot in dst.iter_mut() {
            *slot = self.bytes[pos];
            pos += 1;
            if pos == self.bytes.len() {
                pos = 0;
            }
        }
    }
}

impl Default for PayloadSpec {
    fn default() -> Self {
        Self {
            bytes: DEFAULT_PAYLOAD.into(),
        }
    }
}
