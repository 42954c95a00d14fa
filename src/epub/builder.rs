//! EPUB 3 package assembly.
//!
//! Builds the on-disk book tree (container descriptor, package document,
//! both navigation documents) from book metadata plus the processed
//! chapter and asset lists, then serializes it into the final archive.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::book::{xhtml_filename, BookInfo, Chapter, TocNode};
use crate::error::Result;
use crate::transform::toc;
use crate::util::escape_xml;

use super::archive::write_epub_archive;

/// The exact byte content of the `mimetype` file; stored uncompressed as
/// the archive's first entry.
pub const MIMETYPE: &str = "application/epub+zip";

const CONTAINER_XML: &str = "<?xml version=\"1.0\"?>\
<container version=\"1.0\" xmlns=\"urn:oasis:names:tc:opendocument:xmlns:container\">\
<rootfiles>\
<rootfile full-path=\"OEBPS/content.opf\" media-type=\"application/oebps-package+xml\" />\
</rootfiles>\
</container>";

/// Assembles the EPUB directory tree and archive for one book.
///
/// No locking is performed; two processes must not target the same output
/// directory concurrently.
pub struct EpubPackager<'a> {
    book: &'a BookInfo,
    chapters: &'a [Chapter],
    css_files: &'a [String],
    image_files: &'a [String],
    cover: Option<&'a str>,
}

impl<'a> EpubPackager<'a> {
    /// A packager for the given book and its flat, download-ordered
    /// chapter list.
    pub fn new(book: &'a BookInfo, chapters: &'a [Chapter]) -> Self {
        Self {
            book,
            chapters,
            css_files: &[],
            image_files: &[],
            cover: None,
        }
    }

    /// The stylesheet files present under `OEBPS/Styles`, in registry
    /// index order.
    pub fn with_styles(mut self, css_files: &'a [String]) -> Self {
        self.css_files = css_files;
        self
    }

    /// The image files present under `OEBPS/Images`.
    pub fn with_images(mut self, image_files: &'a [String]) -> Self {
        self.image_files = image_files;
        self
    }

    /// The cover image reference recorded during content transformation
    /// (e.g. `Images/cover.jpg`).
    pub fn with_cover(mut self, cover: &'a str) -> Self {
        self.cover = Some(cover);
        self
    }

    /// Write the package into `book_dir` and serialize it to
    /// `<book_dir>/<identifier>.epub`, replacing any archive from a prior
    /// run. Pre-existing directories are reused, so a partial earlier run
    /// is not an error.
    pub fn build(&self, toc_nodes: &[TocNode], book_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(book_dir.join("META-INF"))?;
        fs::create_dir_all(book_dir.join("OEBPS"))?;

        fs::write(book_dir.join("mimetype"), MIMETYPE)?;
        fs::write(book_dir.join("META-INF/container.xml"), CONTAINER_XML)?;
        fs::write(
            book_dir.join("OEBPS/content.opf"),
            self.content_opf(),
        )?;
        fs::write(book_dir.join("OEBPS/toc.ncx"), self.toc_ncx(toc_nodes))?;
        fs::write(book_dir.join("OEBPS/nav.xhtml"), self.nav_xhtml(toc_nodes))?;

        let epub_path = book_dir.join(format!("{}.epub", self.book.identifier));
        if epub_path.is_file() {
            fs::remove_file(&epub_path)?;
        }
        write_epub_archive(book_dir, &epub_path)?;
        Ok(epub_path)
    }

    /// Generate the EPUB 3 package document.
    fn content_opf(&self) -> String {
        let book = self.book;
        let mut opf = String::new();

        opf.push_str(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
             <package xmlns=\"http://www.idpf.org/2007/opf\" unique-identifier=\"bookid\" version=\"3.0\">\n\
             <metadata xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\n",
        );

        opf.push_str(&format!(
            "<dc:title>{}</dc:title>\n",
            escape_xml(&book.title)
        ));
        for author in &book.authors {
            opf.push_str(&format!(
                "<dc:creator>{}</dc:creator>\n",
                escape_xml(&author.name)
            ));
        }
        opf.push_str(&format!(
            "<dc:description>{}</dc:description>\n",
            escape_xml(book.description.as_deref().unwrap_or(""))
        ));
        for subject in &book.subjects {
            opf.push_str(&format!(
                "<dc:subject>{}</dc:subject>\n",
                escape_xml(&subject.name)
            ));
        }
        opf.push_str(&format!(
            "<dc:publisher>{}</dc:publisher>\n",
            escape_xml(&book.publisher_names())
        ));
        opf.push_str(&format!(
            "<dc:rights>{}</dc:rights>\n",
            escape_xml(book.rights.as_deref().unwrap_or(""))
        ));
        opf.push_str("<dc:language>en-US</dc:language>\n");
        opf.push_str(&format!(
            "<dc:date>{}</dc:date>\n",
            book.issued.as_deref().unwrap_or("")
        ));
        opf.push_str(&format!(
            "<dc:identifier id=\"bookid\">{}</dc:identifier>\n",
            escape_xml(book.package_id())
        ));
        // regeneration always restamps this; EPUB 3 requires it
        let modified = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        opf.push_str(&format!(
            "<meta property=\"dcterms:modified\">{modified}</meta>\n"
        ));
        opf.push_str("</metadata>\n");

        opf.push_str("<manifest>\n");
        opf.push_str("<item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\" />\n");
        opf.push_str(
            "<item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\" />\n",
        );
        for chapter in self.chapters {
            let filename = chapter.xhtml_filename();
            opf.push_str(&format!(
                "<item id=\"{}\" href=\"{}\" media-type=\"application/xhtml+xml\" />\n",
                manifest_id(&filename),
                filename
            ));
        }
        for image in self.unique_images() {
            let (stem, extension) = match image.rsplit_once('.') {
                Some((stem, ext)) => (stem.replace('.', ""), ext),
                None => (image.to_string(), ""),
            };
            let media = if extension.contains("jp") {
                "jpeg"
            } else {
                extension
            };
            let properties = if self.cover.is_some_and(|c| c.contains(image)) {
                " properties=\"cover-image\""
            } else {
                ""
            };
            opf.push_str(&format!(
                "<item id=\"img_{}\" href=\"Images/{}\" media-type=\"image/{}\"{} />\n",
                escape_xml(&stem),
                image,
                media,
                properties
            ));
        }
        for index in 0..self.css_files.len() {
            opf.push_str(&format!(
                "<item id=\"style_{index:0>2}\" href=\"Styles/Style{index:0>2}.css\" media-type=\"text/css\" />\n"
            ));
        }
        opf.push_str("</manifest>\n");

        opf.push_str("<spine toc=\"ncx\">\n");
        for chapter in self.chapters {
            opf.push_str(&format!(
                "<itemref idref=\"{}\"/>\n",
                manifest_id(&chapter.xhtml_filename())
            ));
        }
        opf.push_str("</spine>\n");

        let cover_href = self
            .chapters
            .first()
            .map(|c| c.xhtml_filename())
            .unwrap_or_else(|| "cover.xhtml".to_string());
        opf.push_str(&format!(
            "<guide><reference href=\"{cover_href}\" title=\"Cover\" type=\"cover\" /></guide>\n"
        ));
        opf.push_str("</package>");
        opf
    }

    /// Image file list with duplicates dropped, first occurrence wins.
    fn unique_images(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for image in self.image_files {
            if !seen.contains(&image.as_str()) {
                seen.push(image);
            }
        }
        seen
    }

    /// Generate the NCX document kept for EPUB 2 reader compatibility.
    fn toc_ncx(&self, toc_nodes: &[TocNode]) -> String {
        let nav_map = toc::render_nav_map(toc_nodes);
        format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\" standalone=\"no\" ?>\n\
             <!DOCTYPE ncx PUBLIC \"-//NISO//DTD ncx 2005-1//EN\" \"http://www.daisy.org/z3986/2005/ncx-2005-1.dtd\">\n\
             <ncx xmlns=\"http://www.daisy.org/z3986/2005/ncx/\" version=\"2005-1\">\n\
             <head>\n\
             <meta content=\"ID:ISBN:{id}\" name=\"dtb:uid\"/>\n\
             <meta content=\"{depth}\" name=\"dtb:depth\"/>\n\
             <meta content=\"0\" name=\"dtb:totalPageCount\"/>\n\
             <meta content=\"0\" name=\"dtb:maxPageNumber\"/>\n\
             </head>\n\
             <docTitle><text>{title}</text></docTitle>\n\
             <docAuthor><text>{author}</text></docAuthor>\n\
             <navMap>{nav_map}</navMap>\n\
             </ncx>",
            id = escape_xml(self.book.package_id()),
            depth = nav_map.max_depth,
            title = escape_xml(&self.book.title),
            author = escape_xml(&self.book.author_names()),
            nav_map = nav_map.xml,
        )
    }

    /// Generate the EPUB 3 navigation document.
    fn nav_xhtml(&self, toc_nodes: &[TocNode]) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
             <!DOCTYPE html>\n\
             <html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\" xml:lang=\"en\" lang=\"en\">\n\
             <head>\n<meta charset=\"utf-8\" />\n<title>{title}</title>\n</head>\n\
             <body>\n<nav epub:type=\"toc\" id=\"toc\">\n\
             <h1>Table of Contents</h1>\n<ol>\n{items}</ol>\n</nav>\n</body>\n</html>",
            title = escape_xml(&self.book.title),
            items = toc::render_nav_list(toc_nodes),
        )
    }
}

/// Manifest/spine id for a chapter file: the filename with its extension
/// and remaining dots dropped.
fn manifest_id(filename: &str) -> String {
    let parts: Vec<&str> = filename.split('.').collect();
    let stem = if parts.len() > 1 {
        parts[..parts.len() - 1].concat()
    } else {
        filename.to_string()
    };
    escape_xml(&stem)
}

/// Render a chapter's full XHTML page: the aggregated CSS fragment in the
/// head, the serialized content root in the body. `kindle_fixes` adds the
/// table/pre overflow rules e-ink readers need.
pub fn chapter_document(css: &str, body: &str, kindle_fixes: bool) -> String {
    let mut base_css = String::from(
        "body{margin:1em;background-color:transparent!important;}\
         #sbo-rt-content *{text-indent:0pt!important;}\
         #sbo-rt-content .bq{margin-right:1em!important;}",
    );
    if kindle_fixes {
        base_css.push_str(
            "#sbo-rt-content *{word-wrap:break-word!important;word-break:break-word!important;}\
             #sbo-rt-content table,#sbo-rt-content pre{overflow-x:unset!important;overflow:unset!important;\
             overflow-y:unset!important;white-space:pre-wrap!important;}",
        );
    }
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\" xml:lang=\"en\" xmlns=\"http://www.w3.org/1999/xhtml\" \
         xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
         xsi:schemaLocation=\"http://www.w3.org/2002/06/xhtml2/ http://www.w3.org/MarkUp/SCHEMA/xhtml2.xsd\" \
         xmlns:epub=\"http://www.idpf.org/2007/ops\">\n\
         <head>\n\
         {css}\n\
         <style type=\"text/css\">{base_css}</style>\n\
         </head>\n\
         <body>{body}</body>\n\
         </html>"
    )
}

/// Persist a transformed chapter into `OEBPS/<name>.xhtml` under the book
/// directory. The filename's `.html` → `.xhtml` rewrite is applied here
/// too, so callers may pass either form.
pub fn write_chapter(
    book_dir: &Path,
    filename: &str,
    css: &str,
    body: &str,
    kindle_fixes: bool,
) -> Result<()> {
    let oebps = book_dir.join("OEBPS");
    fs::create_dir_all(&oebps)?;
    fs::write(
        oebps.join(xhtml_filename(filename)),
        chapter_document(css, body, kindle_fixes),
    )?;
    Ok(())
}
