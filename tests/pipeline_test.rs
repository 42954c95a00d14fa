//! Full-pipeline test: stylesheet registration across chapters, asset
//! collection through a stub fetcher, the default-cover fallback, and the
//! resulting package.

use std::collections::HashMap;
use std::fs;

use tempfile::TempDir;

use bindery::epub::{collect_stylesheets, write_chapter};
use bindery::transform::cover::default_cover_page;
use bindery::{
    AssetRegistry, BookInfo, Chapter, ContentTransformer, Entropy, EpubPackager, Error, Fetcher,
    Result, TocNode,
};

struct Never;

impl Entropy for Never {
    fn next_f64(&mut self) -> f64 {
        0.0
    }
}

struct MapFetcher(HashMap<String, Vec<u8>>);

impl Fetcher for MapFetcher {
    fn fetch(&mut self, url: &str) -> Result<Vec<u8>> {
        self.0
            .get(url)
            .cloned()
            .ok_or_else(|| Error::AssetUnavailable(url.to_string()))
    }
}

#[test]
fn stylesheets_shared_across_chapters_land_once() {
    let dir = TempDir::new().unwrap();
    let book = BookInfo::from_json(
        r#"{"identifier": "42", "title": "Styled", "web_url": "https://example.com/book/42/"}"#,
    )
    .unwrap();
    let chapters = vec![Chapter::new("ch1.html", "One"), Chapter::new("ch2.html", "Two")];

    let mut transformer =
        ContentTransformer::with_entropy("42", "https://example.com/book/42/", Never);
    let mut registry = AssetRegistry::new();

    let shared = vec!["https://example.com/book/42/epub.css".to_string()];
    for chapter in &chapters {
        let html = format!(
            "<html><head><link rel=\"stylesheet\" href=\"/site.css\"/></head>\
             <body><div id=\"sbo-rt-content\"><p>{}</p></div></body></html>",
            chapter.label
        );
        let page = transformer
            .transform(&html, &mut registry, &shared, false)
            .unwrap();
        // both chapters reference the same two registered stylesheets
        assert!(page.css.contains("Styles/Style00.css"));
        assert!(page.css.contains("Styles/Style01.css"));
        write_chapter(dir.path(), &chapter.filename, &page.css, &page.xhtml, false).unwrap();
    }
    assert_eq!(registry.stylesheet_urls().len(), 2);

    let mut fetcher = MapFetcher(HashMap::from([
        (
            "https://example.com/book/42/epub.css".to_string(),
            b"p{margin:0}".to_vec(),
        ),
        (
            "https://example.com/site.css".to_string(),
            b"body{}".to_vec(),
        ),
    ]));
    let styles = collect_stylesheets(
        &mut fetcher,
        &registry,
        &dir.path().join("OEBPS/Styles"),
    )
    .unwrap();
    assert_eq!(styles, ["Style00.css", "Style01.css"]);

    EpubPackager::new(&book, &chapters)
        .with_styles(&styles)
        .build(&[], dir.path())
        .unwrap();

    let opf = fs::read_to_string(dir.path().join("OEBPS/content.opf")).unwrap();
    assert!(opf.contains("href=\"Styles/Style00.css\""));
    assert!(opf.contains("href=\"Styles/Style01.css\""));
}

#[test]
fn default_cover_page_when_content_has_none() {
    let dir = TempDir::new().unwrap();
    let book = BookInfo::from_json(
        r#"{"identifier": "42", "title": "Plain", "cover": "https://example.com/covers/42.jpg"}"#,
    )
    .unwrap();

    let mut transformer =
        ContentTransformer::with_entropy("42", "https://example.com/book/42/", Never);
    let mut registry = AssetRegistry::new();
    let page = transformer
        .transform(
            "<html><body><div id=\"sbo-rt-content\"><p>no cover here</p></div></body></html>",
            &mut registry,
            &[],
            true,
        )
        .unwrap();
    assert!(page.cover.is_none());

    // fall back to the metadata cover: synthesize a dedicated cover page
    // and prepend it to the chapter list
    let (cover_css, cover_xhtml) = default_cover_page("default_cover.jpg");
    write_chapter(dir.path(), "default_cover.xhtml", &cover_css, &cover_xhtml, false).unwrap();
    write_chapter(dir.path(), "ch1.html", &page.css, &page.xhtml, false).unwrap();

    let chapters = vec![
        Chapter::new("default_cover.xhtml", "Cover"),
        Chapter::new("ch1.html", "One"),
    ];
    let toc = vec![TocNode {
        id: "n1".into(),
        label: "One".into(),
        href: "ch1.html".into(),
        depth: 1,
        ..TocNode::default()
    }];

    fs::create_dir_all(dir.path().join("OEBPS/Images")).unwrap();
    fs::write(dir.path().join("OEBPS/Images/default_cover.jpg"), b"jpg").unwrap();
    let images = vec!["default_cover.jpg".to_string()];

    EpubPackager::new(&book, &chapters)
        .with_images(&images)
        .with_cover("Images/default_cover.jpg")
        .build(&toc, dir.path())
        .unwrap();

    let opf = fs::read_to_string(dir.path().join("OEBPS/content.opf")).unwrap();
    // the synthesized cover page leads the spine and the guide points at it
    assert!(opf.contains("<itemref idref=\"default_cover\"/>"));
    assert!(opf.contains("<reference href=\"default_cover.xhtml\" title=\"Cover\" type=\"cover\" />"));
    assert!(opf.contains(
        "<item id=\"img_default_cover\" href=\"Images/default_cover.jpg\" media-type=\"image/jpeg\" properties=\"cover-image\" />"
    ));

    let cover_file = fs::read_to_string(dir.path().join("OEBPS/default_cover.xhtml")).unwrap();
    assert!(cover_file.contains("<div id=\"Cover\"><img src=\"Images/default_cover.jpg\"/></div>"));
}
