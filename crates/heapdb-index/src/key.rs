//! Key types an index can be instantiated over.

use std::cmp::Ordering;
use std::fmt;

use bytes::BufMut;
use heapdb_common::cast::truncate_to_width;
use heapdb_common::{Key, TypeTag};

use crate::error::{IndexError, IndexResult};

/// A key with a fixed-width binary encoding and a total order.
///
/// Implemented for `i32` (INT), `f32` (FLOAT) and `String` (VARCHAR).
pub trait KeyType: Clone + fmt::Debug + Send + Sync + 'static {
    /// Column type this key represents.
    const TAG: TypeTag;

    /// Validates an encoded key width.
    fn check_width(width: usize) -> IndexResult<()> {
        let ok = match Self::TAG.native_width() {
            Some(native) => native == width,
            None => width > 0,
        };
        if ok {
            Ok(())
        } else {
            Err(IndexError::InvalidKeyWidth {
                tag: Self::TAG,
                width,
            })
        }
    }

    /// Writes exactly `width` bytes.
    fn encode<B: BufMut>(&self, width: usize, buf: &mut B);

    /// Reads a key from exactly `width` bytes.
    fn decode(bytes: &[u8]) -> Self;

    /// Total order over keys.
    fn compare(&self, other: &Self) -> Ordering;

    /// Unwraps a [`Key`] of the matching variant.
    fn from_key(key: Key) -> IndexResult<Self>;

    /// Wraps the key.
    fn into_key(self) -> Key;
}

fn mismatch(expected: TypeTag, key: &Key) -> IndexError {
    IndexError::KeyTypeMismatch {
        expected,
        actual: key.tag(),
    }
}

impl KeyType for i32 {
    const TAG: TypeTag = TypeTag::Int;

    fn encode<B: BufMut>(&self, _width: usize, buf: &mut B) {
        buf.put_i32_le(*self);
    }

    fn decode(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&bytes[..4]);
        i32::from_le_bytes(raw)
    }

    fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn from_key(key: Key) -> IndexResult<Self> {
        match key {
            Key::Int(v) => Ok(v),
            other => Err(mismatch(Self::TAG, &other)),
        }
    }

    fn into_key(self) -> Key {
        Key::Int(self)
    }
}

impl KeyType for f32 {
    const TAG: TypeTag = TypeTag::Float;

    fn encode<B: BufMut>(&self, _width: usize, buf: &mut B) {
        buf.put_f32_le(*self);
    }

    fn decode(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&bytes[..4]);
        f32::from_le_bytes(raw)
    }

    fn compare(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }

    fn from_key(key: Key) -> IndexResult<Self> {
        match key {
            Key::Float(v) => Ok(v),
            other => Err(mismatch(Self::TAG, &other)),
        }
    }

    fn into_key(self) -> Key {
        Key::Float(self)
    }
}

impl KeyType for String {
    const TAG: TypeTag = TypeTag::Varchar;

    fn encode<B: BufMut>(&self, width: usize, buf: &mut B) {
        let bytes = truncate_to_width(self, width).as_bytes();
        buf.put_slice(bytes);
        buf.put_bytes(0, width - bytes.len());
    }

    fn decode(bytes: &[u8]) -> Self {
        let end = bytes.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
        String::from_utf8_lossy(&bytes[..end]).into_owned()
    }

    fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn from_key(key: Key) -> IndexResult<Self> {
        match key {
            Key::Varchar(v) => Ok(v),
            other => Err(mismatch(Self::TAG, &other)),
        }
    }

    fn into_key(self) -> Key {
        Key::Varchar(self)
    }
}
