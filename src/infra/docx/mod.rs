pub mod docx_extractor;

pub use docx_extractor::DocxExtractor;
