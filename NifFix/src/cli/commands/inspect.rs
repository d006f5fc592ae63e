//! Inspect command

use std::path::Path;

use crate::inspect::inspect_nif;

/// Inspect a NIF file and display its structure.
pub fn execute(path: &Path, json: bool) -> anyhow::Result<()> {
    let info = inspect_nif(path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("NIF File Information");
    println!("====================");
    println!("Header:       {}", info.header_line);
    println!(
        "Version:      {}{}",
        info.version,
        if info.supported { "" } else { " (unsupported)" }
    );
    println!("User version: {}", info.user_version);
    println!("File size:    {} bytes", info.file_size);
    println!("Blocks:       {}", info.block_count);
    println!("Strings:      {}", info.string_count);
    println!(
        "Meshes:       {} ({} data streams)",
        info.mesh_count, info.data_stream_count
    );
    println!();

    println!("Block types:");
    println!("------------");
    for (name, count) in &info.block_types {
        println!("  {count:5} x {name}");
    }
    println!();

    println!("Blocks:");
    println!("-------");
    for block in &info.blocks {
        print!(
            "  [{:4}] 0x{:08x} {:>8} bytes  {}",
            block.index, block.offset, block.size, block.type_name
        );
        match &block.detail {
            Some(detail) => println!("  {detail}"),
            None => println!(),
        }
    }

    if !info.supported {
        return Ok(());
    }

    println!();
    println!("Index streams ({}):", info.located.len());
    for located in &info.located {
        println!(
            "  mesh {} -> stream {} region {}: {} triangles ({}) at 0x{:x}",
            located.mesh,
            located.stream,
            located.region,
            located.descriptor.triangle_count(),
            located.descriptor.width(),
            located.descriptor.offset()
        );
    }
    for preview in &info.previews {
        let (cur, fix) = (preview.current, preview.fixed);
        println!(
            "  stream {} region {}: first triangle ({}, {}, {}) -> ({}, {}, {})",
            preview.stream, preview.region, cur.i0, cur.i1, cur.i2, fix.i0, fix.i1, fix.i2
        );
    }
    if !info.skipped.is_empty() {
        println!();
        println!("Skipped ({}):", info.skipped.len());
        for skipped in &info.skipped {
            println!(
                "  mesh {} -> stream {}: {}",
                skipped.mesh, skipped.stream, skipped.reason
            );
        }
    }

    Ok(())
}
