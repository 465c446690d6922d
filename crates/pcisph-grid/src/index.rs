//! Sort permutation and the cell bucket table.

use pcisph_core::NO_CELL_ID;

/// Sort the parallel `(cell, particle)` arrays by ascending cell.
///
/// Ties are broken by particle id, so with `particles` initialised to
/// `0..n` equal cells end up ordered by original particle id. `scratch`
/// holds the pairs while sorting; reusing it across calls avoids a
/// fresh allocation per step.
pub fn sort_by_cell(cells: &mut [u32], particles: &mut [u32], scratch: &mut Vec<(u32, u32)>) {
    debug_assert_eq!(cells.len(), particles.len());
    scratch.clear();
    scratch.extend(cells.iter().copied().zip(particles.iter().copied()));
    scratch.sort_unstable();
    for (i, &(cell, particle)) in scratch.iter().enumerate() {
        cells[i] = cell;
        particles[i] = particle;
    }
}

/// Index of the first sorted particle in `cell`, or [`NO_CELL_ID`].
///
/// The per-cell body of the INDEX stage. `sorted_cells` must be sorted.
#[inline]
pub fn first_particle_in_cell(sorted_cells: &[u32], cell: u32) -> u32 {
    let start = sorted_cells.partition_point(|&c| c < cell);
    match sorted_cells.get(start) {
        Some(&c) if c == cell => start as u32,
        _ => NO_CELL_ID,
    }
}

/// Forward-fill empty cells in place.
///
/// Scans from the last entry downward; every [`NO_CELL_ID`] inherits the
/// most recent non-empty start seen to its right. The scan is seeded with
/// `particle_count`, so the trailing sentinel and any run of empty cells
/// at the end resolve to the end of the particle range.
pub fn fix_bucket_table(table: &mut [u32], particle_count: u32) {
    let mut recent = particle_count;
    for entry in table.iter_mut().rev() {
        if *entry == NO_CELL_ID {
            *entry = recent;
        } else {
            recent = *entry;
        }
    }
}

/// Build the full bucket table (length `cell_count + 1`) from sorted
/// cell ids. Entry `c` is the first sorted particle of cell `c` or of the
/// next non-empty cell; entry `cell_count` is the particle count.
pub fn build_bucket_table(sorted_cells: &[u32], cell_count: usize) -> Vec<u32> {
    let mut table: Vec<u32> = (0..cell_count as u32)
        .map(|c| first_particle_in_cell(sorted_cells, c))
        .collect();
    table.push(sorted_cells.len() as u32);
    fix_bucket_table(&mut table, sorted_cells.len() as u32);
    table
}

/// Invert a new → old permutation into old → new.
pub fn inverse_permutation(sorted_to_original: &[u32], original_to_sorted: &mut [u32]) {
    debug_assert_eq!(sorted_to_original.len(), original_to_sorted.len());
    for (sorted, &original) in sorted_to_original.iter().enumerate() {
        original_to_sorted[original as usize] = sorted as u32;
    }
}
