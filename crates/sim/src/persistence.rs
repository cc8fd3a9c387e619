//! Domain mask files.
//!
//! A saved domain is the flat row-major mask wrapped in a JSON object:
//! `{"myArray":[0,0,1,...]}`. Nothing else is persisted.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::grid::{CellKind, GridSize, SOLID};

/// Default file name used by the interactive save/load keys.
pub const DEFAULT_DOMAIN_FILE: &str = "testDomain.json";

#[derive(Debug, Serialize, Deserialize)]
struct DomainFile {
    #[serde(rename = "myArray")]
    cells: Vec<i32>,
}

pub fn save_mask(mask: &[i32]) -> Result<Vec<u8>, PersistenceError> {
    let file = DomainFile {
        cells: mask.to_vec(),
    };
    Ok(serde_json::to_vec(&file)?)
}

/// Parse and validate a saved mask for `grid`. Nothing is returned unless
/// every cell is present and binary and the outer ring is solid.
pub fn load_mask(bytes: &[u8], grid: GridSize) -> Result<Vec<i32>, PersistenceError> {
    let file: DomainFile = serde_json::from_slice(bytes)?;
    let expected = grid.cell_count();
    if file.cells.len() != expected {
        return Err(PersistenceError::SizeMismatch {
            expected,
            actual: file.cells.len(),
        });
    }
    if let Some((index, &value)) = file
        .cells
        .iter()
        .enumerate()
        .find(|&(_, &value)| CellKind::from_mask(value).is_none())
    {
        return Err(PersistenceError::InvalidMask { index, value });
    }
    if let Some(index) = (0..expected)
        .find(|&k| grid.is_ring(k % grid.width, k / grid.width) && file.cells[k] != SOLID)
    {
        return Err(PersistenceError::OpenBoundary {
            i: index % grid.width,
            j: index / grid.width,
        });
    }
    Ok(file.cells)
}

pub fn save_mask_file(path: &Path, mask: &[i32]) -> Result<(), PersistenceError> {
    let bytes = save_mask(mask)?;
    std::fs::write(path, bytes)?;
    log::info!("saved domain to {}", path.display());
    Ok(())
}

pub fn load_mask_file(path: &Path, grid: GridSize) -> Result<Vec<i32>, PersistenceError> {
    let bytes = std::fs::read(path)?;
    let mask = load_mask(&bytes, grid)?;
    log::info!("loaded domain from {}", path.display());
    Ok(mask)
}
