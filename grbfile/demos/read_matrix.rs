//! Read `example_matrix.grb` back and report what it holds

use grbfile::{inspect, read_path, BinFileView, MemoryEngine, ReadOptions};
use std::time::Instant;

fn main() -> grbfile::Result<()> {
    let filename = "example_matrix.grb";

    if !std::path::Path::new(filename).exists() {
        println!("File '{filename}' not found!");
        println!("   Run 'cargo run --example write_matrix' first");
        return Ok(());
    }

    let start = Instant::now();
    let view = BinFileView::open(filename)?;
    println!("Mapped header in {:.3}ms", start.elapsed().as_secs_f64() * 1000.0);
    println!("{}", view.header_text().trim_end());
    for region in view.regions() {
        println!("   {:<3} {:>12} bytes at offset {}", region.name, region.len, region.offset);
    }

    let start = Instant::now();
    let engine = MemoryEngine::new();
    let matrix = read_path(&engine, filename, &ReadOptions::default())?;
    let layout = inspect(&engine, &matrix)?;
    println!("\nLoaded in {:?}", start.elapsed());
    println!("   Dimensions: {} x {}", layout.nrows, layout.ncols);
    println!("   Entries: {}", layout.nvals);
    println!("   Layout: {}", layout.layout());
    println!("   Type: {}", layout.element_type);

    for (row, col) in [(0, 0), (1, 4), (100, 101), (100, 200)] {
        match engine.get_element::<f64>(&matrix, row, col)? {
            Some(value) => println!("   matrix[{row}, {col}] = {value}"),
            None => println!("   matrix[{row}, {col}] is empty"),
        }
    }
    Ok(())
}
