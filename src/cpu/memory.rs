//! Machine memory.
//!
//! A flat array of 65536 sixteen-bit cells shared by code and data.
//! Every `u16` is a valid address, so access cannot go out of range.

use thiserror::Error;

/// The number of memory cells.
pub const MEMORY_SIZE: usize = 1 << 16;

/// Word-addressed machine memory.
#[derive(Clone)]
pub struct Memory {
    cells: Box<[u16; MEMORY_SIZE]>,
}

impl Memory {
    /// Create a new memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: Box::new([0; MEMORY_SIZE]),
        }
    }

    #[inline]
    pub fn read(&self, addr: u16) -> u16 {
        self.cells[addr as usize]
    }

    #[inline]
    pub fn write(&mut self, addr: u16, value: u16) {
        self.cells[addr as usize] = value;
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Copy a program image into memory starting at address 0.
    ///
    /// Cells past the end of the image are zeroed.
    pub fn load_image(&mut self, image: &[u16]) -> Result<(), MemoryError> {
        if image.len() > MEMORY_SIZE {
            return Err(MemoryError::ImageTooLarge {
                size: image.len(),
                available: MEMORY_SIZE,
            });
        }

        self.cells[..image.len()].copy_from_slice(image);
        self.cells[image.len()..].fill(0);
        Ok(())
    }

    /// Cells `start..start + count`, clipped to the end of memory.
    pub fn dump(&self, start: u16, count: usize) -> &[u16] {
        let start = start as usize;
        let end = start.saturating_add(count).min(MEMORY_SIZE);
        &self.cells[start..end]
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|&&cell| cell != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur while filling memory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("image of {size} words exceeds memory of {available} words")]
    ImageTooLarge { size: usize, available: usize },
}
