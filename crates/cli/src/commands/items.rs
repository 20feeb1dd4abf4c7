use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use itemshelf_core::domain::{ItemList, ItemView};
use itemshelf_core::Shelf;

pub fn list(shelf: &Shelf, json: bool) -> Result<()> {
    let items = shelf.list_items()?;
    if !json && items.is_empty() {
        println!("No items yet. Use `itemshelf add` to add one.");
        return Ok(());
    }
    print_items(items, json)
}

pub fn search(shelf: &Shelf, keyword: &str, json: bool) -> Result<()> {
    let items = shelf.search_items(keyword)?;
    if !json && items.is_empty() {
        println!("No items match \"{keyword}\".");
        return Ok(());
    }
    print_items(items, json)
}

pub fn show(shelf: &Shelf, id: i64, json: bool) -> Result<()> {
    let item = shelf.get_item(id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        println!("Item #{}", item.id);
        println!("{}", "-".repeat(40));
        println!("  Name:     {}", item.name);
        println!("  Category: {}", item.category);
        println!("  Image:    {}", item.image_name);
    }
    Ok(())
}

fn print_items(items: Vec<ItemView>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&ItemList::from(items))?);
    } else {
        println!("{}", items_table(&items));
    }
    Ok(())
}

pub(crate) fn items_table(items: &[ItemView]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ID"),
        Cell::new("Name"),
        Cell::new("Category"),
        Cell::new("Image"),
    ]);
    for item in items {
        table.add_row(vec![
            Cell::new(item.id),
            Cell::new(&item.name),
            Cell::new(&item.category),
            Cell::new(&item.image_name),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_item(id: i64, name: &str) -> ItemView {
        ItemView {
            id,
            name: name.to_string(),
            category: "food".to_string(),
            image_name: "abc.jpg".to_string(),
        }
    }

    #[test]
    fn test_items_table_has_row_per_item() {
        let table = items_table(&[make_item(1, "apple"), make_item(2, "banana")]);
        assert_eq!(table.row_iter().count(), 2);
        let rendered = table.to_string();
        assert!(rendered.contains("apple"));
        assert!(rendered.contains("banana"));
        assert!(rendered.contains("Category"));
    }

    #[test]
    fn test_items_table_empty() {
        let table = items_table(&[]);
        assert_eq!(table.row_iter().count(), 0);
    }
}
