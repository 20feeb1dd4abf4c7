use std::path::Path;

use anyhow::Result;
use itemshelf_core::error::Error;
use itemshelf_core::Shelf;

pub fn run(shelf: &Shelf, name: &str, category: &str, image: &Path) -> Result<()> {
    let bytes = std::fs::read(image).map_err(|source| Error::BlobRead {
        path: image.to_path_buf(),
        source,
    })?;
    let id = shelf.ingest(name, category, &bytes)?;
    println!("item received: {name} (id {id})");
    Ok(())
}
