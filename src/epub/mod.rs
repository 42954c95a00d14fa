//! EPUB package assembly: asset registry, best-effort asset collection,
//! package/navigation document generation, and container serialization.

mod archive;
mod assets;
mod builder;
mod registry;

pub use archive::write_epub_archive;
pub use assets::{collect_images, collect_stylesheets, Fetcher};
pub use builder::{chapter_document, write_chapter, EpubPackager, MIMETYPE};
pub use registry::AssetRegistry;
