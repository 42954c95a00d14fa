//! End-to-end packaging tests: transform chapters, write the book tree,
//! build the archive, and verify the container layout.

use std::fs::{self, File};

use tempfile::TempDir;
use zip::{CompressionMethod, ZipArchive};

use bindery::epub::write_chapter;
use bindery::{
    AssetRegistry, BookInfo, Chapter, ContentTransformer, Entropy, EpubPackager, TocNode,
};

/// Entropy stub that never triggers the sampled session check.
struct Never;

impl Entropy for Never {
    fn next_f64(&mut self) -> f64 {
        0.0
    }
}

fn sample_book() -> BookInfo {
    BookInfo::from_json(
        r#"{
            "identifier": "123",
            "title": "T",
            "isbn": "123",
            "authors": [{"name": "A"}],
            "web_url": "https://example.com/library/view/t/123/"
        }"#,
    )
    .unwrap()
}

fn sample_toc() -> Vec<TocNode> {
    let entry = |id: &str, label: &str, href: &str| TocNode {
        id: id.to_string(),
        label: label.to_string(),
        href: href.to_string(),
        depth: 1,
        ..TocNode::default()
    };
    vec![entry("n1", "One", "ch1.html"), entry("n2", "Two", "ch2.html")]
}

fn chapter_html(body: &str) -> String {
    format!("<html><head></head><body><div id=\"sbo-rt-content\">{body}</div></body></html>")
}

#[test]
fn packaging_produces_valid_container() {
    let dir = TempDir::new().unwrap();
    let book = sample_book();
    let chapters = vec![Chapter::new("ch1.html", "One"), Chapter::new("ch2.html", "Two")];

    let mut transformer = ContentTransformer::with_entropy(
        "123",
        "https://example.com/library/view/t/123/",
        Never,
    );
    let mut registry = AssetRegistry::new();

    for (index, chapter) in chapters.iter().enumerate() {
        let page = transformer
            .transform(
                &chapter_html(&format!("<p>chapter {index}</p>")),
                &mut registry,
                &[],
                index == 0,
            )
            .unwrap();
        write_chapter(dir.path(), &chapter.filename, &page.css, &page.xhtml, false).unwrap();
    }

    let epub = EpubPackager::new(&book, &chapters)
        .build(&sample_toc(), dir.path())
        .unwrap();
    assert_eq!(epub, dir.path().join("123.epub"));

    // package document: metadata and spine order
    let opf = fs::read_to_string(dir.path().join("OEBPS/content.opf")).unwrap();
    assert!(opf.contains("<dc:title>T</dc:title>"));
    let ch1 = opf.find("<itemref idref=\"ch1\"/>").unwrap();
    let ch2 = opf.find("<itemref idref=\"ch2\"/>").unwrap();
    assert!(ch1 < ch2);

    // navigation document
    let nav = fs::read_to_string(dir.path().join("OEBPS/nav.xhtml")).unwrap();
    assert!(nav.contains("<a href=\"ch1.xhtml\">One</a>"));
    assert!(nav.contains("<a href=\"ch2.xhtml\">Two</a>"));

    // container layout: mimetype first, stored, nothing else uncompressed
    let mut archive = ZipArchive::new(File::open(&epub).unwrap()).unwrap();
    {
        let first = archive.by_index(0).unwrap();
        assert_eq!(first.name(), "mimetype");
        assert_eq!(first.compression(), CompressionMethod::Stored);
    }
    let names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    assert!(names.contains(&"META-INF/container.xml".to_string()));
    assert!(names.contains(&"OEBPS/content.opf".to_string()));
    assert!(names.contains(&"OEBPS/toc.ncx".to_string()));
    assert!(names.contains(&"OEBPS/nav.xhtml".to_string()));
    assert!(names.contains(&"OEBPS/ch1.xhtml".to_string()));
    assert!(names.contains(&"OEBPS/ch2.xhtml".to_string()));
    assert!(names.iter().all(|n| !n.ends_with(".epub")));
}

#[test]
fn rebuild_overwrites_previous_archive() {
    let dir = TempDir::new().unwrap();
    let book = sample_book();
    let chapters = vec![Chapter::new("ch1.html", "One")];

    write_chapter(dir.path(), "ch1.html", "", "<p>one</p>", false).unwrap();

    let packager = EpubPackager::new(&book, &chapters);
    let first = packager.build(&sample_toc(), dir.path()).unwrap();
    let second = packager.build(&sample_toc(), dir.path()).unwrap();
    assert_eq!(first, second);

    // the second build must not embed the first run's archive
    let mut archive = ZipArchive::new(File::open(&second).unwrap()).unwrap();
    for i in 0..archive.len() {
        let name = archive.by_index(i).unwrap().name().to_string();
        assert!(!name.ends_with(".epub"), "embedded archive: {name}");
    }
}

#[test]
fn first_chapter_cover_flows_into_manifest() {
    let dir = TempDir::new().unwrap();
    let book = sample_book();
    let chapters = vec![Chapter::new("cover.html", "Cover")];

    let mut transformer = ContentTransformer::with_entropy(
        "123",
        "https://example.com/library/view/t/123/",
        Never,
    );
    let mut registry = AssetRegistry::new();
    let page = transformer
        .transform(
            &chapter_html("<div class=\"cover\"><img src=\"images/cover.jpg\"/></div>"),
            &mut registry,
            &[],
            true,
        )
        .unwrap();
    let cover = page.cover.clone().expect("cover detected");
    write_chapter(dir.path(), "cover.html", &page.css, &page.xhtml, false).unwrap();

    // materialize the image the way the asset collector would
    fs::create_dir_all(dir.path().join("OEBPS/Images")).unwrap();
    fs::write(dir.path().join("OEBPS/Images/cover.jpg"), b"jpeg-bytes").unwrap();
    let images = vec!["cover.jpg".to_string()];

    EpubPackager::new(&book, &chapters)
        .with_images(&images)
        .with_cover(&cover)
        .build(&[], dir.path())
        .unwrap();

    let opf = fs::read_to_string(dir.path().join("OEBPS/content.opf")).unwrap();
    assert!(opf.contains("properties=\"cover-image\""));

    let chapter = fs::read_to_string(dir.path().join("OEBPS/cover.xhtml")).unwrap();
    assert!(chapter.contains("<div id=\"Cover\"><img src=\"Images/cover.jpg\"/></div>"));
}
