//! Video memory store
//!
//! A flat array of RGB565 cells grouped into 256-cell sectors. The
//! companion uploads images with WRITE_VRAM and later blits them by sector
//! index. Capacity is fixed at startup; if the requested allocation fails a
//! smaller one is tried, and failing that the store is empty and every VRAM
//! command becomes a no-op.

use alloc::vec::Vec;

use nbrain_protocol::SECTOR_CELLS;

/// Video memory access errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VramError {
    /// Sector index at or beyond the sector count
    SectorOutOfRange,
    /// Range runs past the end of the store
    RangeOutOfBounds,
}

/// Sector-addressed video memory
#[derive(Debug, Clone, Default)]
pub struct VideoMemory {
    cells: Vec<u16>,
    sector_count: u16,
}

impl VideoMemory {
    /// Allocate `requested` sectors, falling back to `fallback` sectors
    pub fn allocate(requested: u16, fallback: u16) -> Self {
        Self::allocate_with(requested, fallback, try_alloc)
    }

    fn allocate_with(
        requested: u16,
        fallback: u16,
        mut alloc: impl FnMut(usize) -> Option<Vec<u16>>,
    ) -> Self {
        for sectors in [requested, fallback] {
            if sectors == 0 {
                continue;
            }
            match alloc(usize::from(sectors) * SECTOR_CELLS) {
                Some(cells) => {
                    info!("VRAM: {} sectors", sectors);
                    return Self {
                        cells,
                        sector_count: sectors,
                    };
                }
                None => warn!("VRAM: allocation of {} sectors failed", sectors),
            }
        }

        error!("VRAM: no memory, image commands disabled");
        Self::default()
    }

    /// Number of addressable sectors
    pub fn sector_count(&self) -> u16 {
        self.sector_count
    }

    /// Total cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Overwrite one sector
    ///
    /// At most [`SECTOR_CELLS`] cells are taken from `cells`; a shorter
    /// source leaves the rest of the sector untouched.
    pub fn write_sector(
        &mut self,
        index: u16,
        cells: impl IntoIterator<Item = u16>,
    ) -> Result<(), VramError> {
        if index >= self.sector_count {
            return Err(VramError::SectorOutOfRange);
        }
        let start = usize::from(index) * SECTOR_CELLS;
        let sector = self
            .cells
            .get_mut(start..start + SECTOR_CELLS)
            .ok_or(VramError::RangeOutOfBounds)?;
        for (slot, cell) in sector.iter_mut().zip(cells) {
            *slot = cell;
        }
        Ok(())
    }

    /// Borrow `count` cells starting at cell `start`
    pub fn read_range(&self, start: usize, count: usize) -> Result<&[u16], VramError> {
        let end = start.checked_add(count).ok_or(VramError::RangeOutOfBounds)?;
        self.cells.get(start..end).ok_or(VramError::RangeOutOfBounds)
    }

    /// Borrow `count` cells starting at the first cell of `sector`
    ///
    /// The range may span following sectors but must end inside the store.
    pub fn sector_range(&self, sector: u16, count: usize) -> Result<&[u16], VramError> {
        if sector >= self.sector_count {
            return Err(VramError::SectorOutOfRange);
        }
        self.read_range(usize::from(sector) * SECTOR_CELLS, count)
    }
}

fn try_alloc(cells: usize) -> Option<Vec<u16>> {
    let mut v = Vec::new();
    v.try_reserve_exact(cells).ok()?;
    v.resize(cells, 0);
    Some(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocates_requested() {
        let vram = VideoMemory::allocate(4, 1);
        assert_eq!(vram.sector_count(), 4);
        assert_eq!(vram.len(), 4 * SECTOR_CELLS);
    }

    #[test]
    fn test_falls_back_when_allocation_fails() {
        let vram = VideoMemory::allocate_with(64, 2, |cells| {
            (cells <= 2 * SECTOR_CELLS).then(|| alloc::vec![0; cells])
        });
        assert_eq!(vram.sector_count(), 2);
    }

    #[test]
    fn test_empty_when_everything_fails() {
        let mut vram = VideoMemory::allocate_with(64, 2, |_| None);
        assert_eq!(vram.sector_count(), 0);
        assert!(vram.is_empty());
        assert_eq!(
            vram.write_sector(0, [1u16; 4]),
            Err(VramError::SectorOutOfRange)
        );
        assert_eq!(vram.sector_range(0, 1), Err(VramError::SectorOutOfRange));
    }

    #[test]
    fn test_write_then_read_sector() {
        let mut vram = VideoMemory::allocate(2, 1);
        vram.write_sector(1, (0..256).map(|i| i as u16)).unwrap();
        let cells = vram.sector_range(1, 256).unwrap();
        assert_eq!(cells[0], 0);
        assert_eq!(cells[255], 255);
        // Sector 0 untouched
        assert!(vram.sector_range(0, 256).unwrap().iter().all(|&c| c == 0));
    }

    #[test]
    fn test_out_of_range_sector_does_not_mutate() {
        let mut vram = VideoMemory::allocate(2, 1);
        assert_eq!(
            vram.write_sector(2, [7u16; 256]),
            Err(VramError::SectorOutOfRange)
        );
        assert!(vram.read_range(0, vram.len()).unwrap().iter().all(|&c| c == 0));
    }

    #[test]
    fn test_range_past_end_rejected() {
        let vram = VideoMemory::allocate(2, 1);
        assert!(vram.sector_range(1, 256).is_ok());
        assert_eq!(vram.sector_range(1, 257), Err(VramError::RangeOutOfBounds));
        assert_eq!(
            vram.read_range(usize::MAX, 2),
            Err(VramError::RangeOutOfBounds)
        );
    }
}
