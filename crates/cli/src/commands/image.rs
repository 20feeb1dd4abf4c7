use std::io::Write;
use std::path::Path;

use anyhow::Result;
use itemshelf_core::domain::IMAGE_EXTENSION;
use itemshelf_core::error::Error;
use itemshelf_core::Shelf;

pub fn run(shelf: &Shelf, name: &str, by_item: bool, out: &Path) -> Result<()> {
    let bytes = if by_item {
        shelf.item_image(parse_item_id(name)?)?
    } else {
        shelf.get_image(name)?
    };

    if out == Path::new("-") {
        std::io::stdout().lock().write_all(&bytes)?;
    } else {
        std::fs::write(out, &bytes)?;
        eprintln!("Wrote {} bytes to {}", bytes.len(), out.display());
    }
    Ok(())
}

/// `42.jpg` → 42.
fn parse_item_id(name: &str) -> Result<i64, Error> {
    name.strip_suffix(IMAGE_EXTENSION)
        .and_then(|stem| stem.parse().ok())
        .ok_or_else(|| Error::InvalidImageName(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_item_id() {
        assert_eq!(parse_item_id("42.jpg").unwrap(), 42);
        assert!(parse_item_id("42.png").is_err());
        assert!(parse_item_id("abc.jpg").is_err());
    }

    #[test]
    fn test_add_then_fetch_by_item_id() {
        let tmp = tempfile::tempdir().unwrap();
        let shelf = Shelf::open_at(&tmp.path().join("shelf")).unwrap();
        shelf.install_default_image(b"placeholder").unwrap();

        let source = tmp.path().join("lamp.jpg");
        std::fs::write(&source, b"lamp pixels").unwrap();
        crate::commands::add::run(&shelf, "lamp", "furniture", &source).unwrap();
        let id = shelf.list_items().unwrap()[0].id;

        let out = tmp.path().join("out.jpg");
        run(&shelf, &format!("{id}.jpg"), true, &out).unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"lamp pixels");

        run(&shelf, &format!("{}.jpg", id + 1), true, &out).unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"placeholder");

        let blob_id = shelf.get_item(id).unwrap().image_name;
        run(&shelf, &blob_id, false, &out).unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"lamp pixels");

        let err = run(&shelf, "lamp.jpg", true, &out).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::InvalidImageName(_))
        ));
    }

    #[test]
    fn test_add_missing_file_is_blob_read_error() {
        let tmp = tempfile::tempdir().unwrap();
        let shelf = Shelf::open_at(tmp.path()).unwrap();
        let err =
            crate::commands::add::run(&shelf, "ghost", "none", &tmp.path().join("absent.jpg"))
                .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::BlobRead { .. })
        ));
        assert!(shelf.list_items().unwrap().is_empty());
    }
}
