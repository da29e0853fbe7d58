use std::collections::HashMap;

use crate::base::mem::HasMemory;

const PAGE_BITS: u64 = 12;
const PAGE_SIZE: usize = 1 << PAGE_BITS;

// a sparse, page-granular byte store that reads anything untouched as 0
#[derive(Debug, Default, Clone)]
pub struct SparseMemory {
    pages: HashMap<u64, Box<[u8; PAGE_SIZE]>>,
}

impl SparseMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lay out `words` back-to-back as little-endian 64-bit values from `base`.
    pub fn init_words(&mut self, base: u64, words: &[u64]) -> Result<(), anyhow::Error> {
        for (i, word) in words.iter().enumerate() {
            self.write_n(base + 8 * i as u64, word.to_le_bytes())?;
        }
        Ok(())
    }

    pub fn pages_touched(&self) -> usize {
        self.pages.len()
    }

    fn split(addr: u64) -> (u64, usize) {
        (addr >> PAGE_BITS, (addr as usize) & (PAGE_SIZE - 1))
    }
}

impl HasMemory for SparseMemory {
    fn read_impl(&self, addr: u64, n: usize) -> Result<Vec<u8>, anyhow::Error> {
        // aligned power-of-two accesses never straddle a page
        let (page, offset) = Self::split(addr);
        Ok(match self.pages.get(&page) {
            Some(bytes) => bytes[offset..offset + n].to_vec(),
            None => vec![0u8; n],
        })
    }

    fn write_impl(&mut self, addr: u64, data: &[u8]) -> Result<(), anyhow::Error> {
        let (page, offset) = Self::split(addr);
        let bytes = self
            .pages
            .entry(page)
            .or_insert_with(|| Box::new([0u8; PAGE_SIZE]));
        bytes[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }
}
