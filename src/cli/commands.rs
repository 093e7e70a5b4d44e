use crate::app::{AppContext, OpdsError, Result};
use crate::catalog::{fix_book_timestamps, resolve_root, CatalogModel};
use crate::domain::{Book, RootCatalog};
use crate::reconcile::reconcile_timestamps;

/// How `load_catalog` should prepare the model.
#[derive(Debug, Clone, Default)]
pub struct CatalogOptions {
    /// Catalog title; the first catalog of the root feed when `None`.
    pub catalog: Option<String>,
    pub hide_newspapers: bool,
    pub hide_already_in_library: bool,
    pub reconcile: bool,
}

/// Resolves the root feed at `url`, downloads the chosen catalog and, on a
/// calibre server, reconciles the timestamps.
pub async fn load_catalog(
    ctx: &AppContext,
    url: &str,
    options: &CatalogOptions,
) -> Result<(RootCatalog, CatalogModel)> {
    let root = resolve_root(url, ctx.fetcher.as_ref()).await?;

    let catalog_url = match &options.catalog {
        Some(title) => root
            .get(title)
            .ok_or_else(|| OpdsError::CatalogNotFound(title.clone()))?,
        None => root
            .first_url()
            .ok_or_else(|| OpdsError::CatalogNotFound(format!("no catalogs at {}", url)))?,
    }
    .to_string();

    let mut model = CatalogModel::new(ctx.library.clone());
    model.set_hide_newspapers(options.hide_newspapers);
    model.set_hide_already_in_library(options.hide_already_in_library);
    model
        .download_catalog(
            &catalog_url,
            ctx.fetcher.as_ref(),
            &ctx.normalizer,
            ctx.config.fetch.page_limit(),
        )
        .await?;

    if options.reconcile && root.is_calibre() {
        reconcile_timestamps(
            &mut model,
            url,
            ctx.fetcher.as_ref(),
            ctx.normalizer.mode(),
            ctx.config.reconcile.unknown_uuid,
        )
        .await?;
    }

    Ok((root, model))
}

/// Books of `model` with the given uuids, in argument order.
pub fn select_books<'a>(model: &'a CatalogModel, uuids: &[String]) -> Result<Vec<&'a Book>> {
    uuids
        .iter()
        .map(|uuid| {
            model
                .find_by_uuid(uuid)
                .ok_or_else(|| OpdsError::BookNotFound(uuid.clone()))
        })
        .collect()
}

pub async fn list_catalogs(ctx: &AppContext, url: &str) -> Result<()> {
    let root = resolve_root(url, ctx.fetcher.as_ref()).await?;

    println!("Server: {}", root.server);
    if root.is_empty() {
        println!("No catalogs");
        return Ok(());
    }

    for link in root.catalogs() {
        let marker = if root.first_title.as_deref() == Some(link.title.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{} {}\n    {}", marker, link.title, link.url);
    }

    Ok(())
}

pub async fn list_books(ctx: &AppContext, url: &str, options: &CatalogOptions) -> Result<()> {
    let (_, model) = load_catalog(ctx, url, options).await?;

    if model.filtered_len() == 0 {
        println!("No books");
        return Ok(());
    }

    for book in model.filtered() {
        println!("{}", format_book(book));
    }
    println!(
        "\n{} of {} books shown",
        model.filtered_len(),
        model.books().len()
    );

    Ok(())
}

pub async fn download_books(
    ctx: &AppContext,
    url: &str,
    catalog: Option<String>,
    uuids: &[String],
) -> Result<()> {
    let options = CatalogOptions {
        catalog,
        reconcile: true,
        ..Default::default()
    };
    let (_, model) = load_catalog(ctx, url, &options).await?;

    for book in select_books(&model, uuids)? {
        let Some(link) = book.download_url() else {
            eprintln!("  ! {} has no download link", book.title());
            continue;
        };

        open::that(link).map_err(|e| OpdsError::Launch {
            url: link.to_string(),
            message: e.to_string(),
        })?;
        ctx.library.add_book(book, Some(link))?;
        println!("  + {}", book.title());
    }

    Ok(())
}

pub async fn fix_timestamps(
    ctx: &AppContext,
    url: &str,
    catalog: Option<String>,
    uuids: &[String],
) -> Result<()> {
    let options = CatalogOptions {
        catalog,
        reconcile: true,
        ..Default::default()
    };
    let (_, model) = load_catalog(ctx, url, &options).await?;
    let books = select_books(&model, uuids)?;

    let changed = fix_book_timestamps(ctx.library.as_ref(), &books)?;
    println!("Updated {} local books", changed);
    Ok(())
}

pub fn list_urls(ctx: &AppContext) {
    let current = ctx.config.current_url();
    for url in &ctx.config.opds_urls {
        let marker = if url == current { "*" } else { " " };
        println!("{} {}", marker, url);
    }
}

fn format_book(book: &Book) -> String {
    let mut line = format!(
        "{}  {}",
        book.timestamp().format("%Y-%m-%d"),
        book.title()
    );
    let authors = book.display_authors();
    if !authors.is_empty() {
        line.push_str(&format!(" by {}", authors));
    }
    if !book.tags().is_empty() {
        line.push_str(&format!(" [{}]", book.tags().join(", ")));
    }
    line.push_str(&format!("\n    {}", book.uuid()));
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_format_book() {
        let book = Book::new(
            "Good Omens",
            vec!["Terry Pratchett".into(), "Neil Gaiman".into()],
            "abc",
            NaiveDate::from_ymd_opt(1990, 5, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            vec!["Fantasy".into(), "Humour".into()],
            vec![],
        );

        assert_eq!(
            format_book(&book),
            "1990-05-01  Good Omens by Terry Pratchett & Neil Gaiman [Fantasy, Humour]\n    abc"
        );
    }

    #[test]
    fn test_format_book_without_authors_or_tags() {
        let book = Book::new("Beowulf", vec![], "b", crate::normalizer::default_timestamp(), vec![], vec![]);
        assert_eq!(format_book(&book), "1980-01-01  Beowulf\n    b");
    }
}
