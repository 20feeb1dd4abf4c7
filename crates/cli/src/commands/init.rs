use std::path::PathBuf;

use anyhow::{Context, Result};
use itemshelf_core::Shelf;

pub fn run(shelf: &Shelf, default_image: Option<PathBuf>) -> Result<()> {
    let config = shelf.config();
    println!("Catalog: {}", config.database_path.display());
    println!("Images:  {}", config.image_dir.display());

    if let Some(path) = default_image {
        let bytes = std::fs::read(&path)
            .with_context(|| format!("cannot read default image {}", path.display()))?;
        shelf.install_default_image(&bytes)?;
        println!("Installed default image from {}", path.display());
    }
    Ok(())
}
