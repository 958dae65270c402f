//! Program image loading.
//!
//! An image is a raw byte stream of little-endian 16-bit words, loaded
//! from address 0.

use crate::cpu::memory::MEMORY_SIZE;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Read a program image from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Vec<u16>, LoadError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .map_err(|e| LoadError::Io(format!("{}: {}", path.display(), e)))?;

    let image = load_bytes(&bytes)?;
    debug!(path = %path.display(), words = image.len(), "loaded program image");
    Ok(image)
}

/// Interpret a byte stream as little-endian words.
///
/// A trailing odd byte is ignored.
pub fn load_bytes(bytes: &[u8]) -> Result<Vec<u16>, LoadError> {
    let words = bytes.len() / 2;
    if words > MEMORY_SIZE {
        return Err(LoadError::ImageTooLarge { words, max: MEMORY_SIZE });
    }
    if bytes.len() % 2 != 0 {
        warn!(len = bytes.len(), "program image has an odd trailing byte; ignoring it");
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Encode words back into an image byte stream.
pub fn to_bytes(image: &[u16]) -> Vec<u8> {
    image.iter().flat_map(|word| word.to_le_bytes()).collect()
}

/// Errors that can occur while loading an image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("image of {words} words exceeds memory of {max} words")]
    ImageTooLarge { words: usize, max: usize },
}
