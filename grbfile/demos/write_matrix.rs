//! Write a banded sparse matrix to `example_matrix.grb`

use grbfile::{write_path, ElementType, MemoryEngine, SparseEngine, WriteOptions};
use std::time::Instant;

fn main() -> grbfile::Result<()> {
    let n: u64 = 200_000;
    let band = 3;
    println!("Building a {n} x {n} FP64 matrix with bandwidth {band}...");

    let start = Instant::now();
    let engine = MemoryEngine::new();
    let mut matrix = engine.matrix_new(ElementType::Fp64, n, n)?;
    let tuples = banded(n, band);
    engine.build(&mut matrix, &tuples)?;
    println!("Built {} entries in {:?}", tuples.len(), start.elapsed());

    let start = Instant::now();
    let options = WriteOptions::default().with_comment("banded demo matrix");
    let written = write_path(&engine, &mut matrix, "example_matrix.grb", &options)?;
    println!("Wrote {written} bytes in {:?}", start.elapsed());
    println!("\nRun 'cargo run --example read_matrix' to read it back!");
    Ok(())
}

fn banded(n: u64, band: u64) -> Vec<(u64, u64, f64)> {
    let mut tuples = Vec::new();
    for row in 0..n {
        let first = row.saturating_sub(band);
        let last = (row + band).min(n - 1);
        for col in first..=last {
            tuples.push((row, col, row as f64 - col as f64 * 0.5));
        }
    }
    tuples
}
