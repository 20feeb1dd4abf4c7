use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use itemshelf_core::domain::DEFAULT_IMAGE;
use itemshelf_core::Shelf;

pub fn run(shelf: &Shelf) -> Result<()> {
    let stats = shelf.status()?;
    let categories = shelf.categories()?;
    let config = shelf.config();
    let default_display = if shelf.blobs().contains(DEFAULT_IMAGE) {
        "installed"
    } else {
        "missing (run `itemshelf init --default-image <path>`)"
    };

    println!();
    println!("  Itemshelf Status");
    println!("  ====================");
    println!();
    println!("   Items:         {:>8}", stats.total_items);
    println!("   Categories:    {:>8}", stats.total_categories);
    println!("   Catalog:       {}", config.database_path.display());
    println!("   Images:        {}", config.image_dir.display());
    println!("   Default image: {default_display}");

    if !categories.is_empty() {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![Cell::new("ID"), Cell::new("Category")]);
        for category in &categories {
            table.add_row(vec![Cell::new(category.id), Cell::new(&category.name)]);
        }
        println!();
        println!("  Categories");
        println!("  ----------");
        println!("{table}");
    }

    println!();
    println!("  Run 'itemshelf items' to list every item.");
    println!();
    Ok(())
}
