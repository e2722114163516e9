// extract.rs - Pluggable content extraction by file kind.
//
// Each extractor family handles a set of extensions and turns raw bytes into
// text. `Extractors` dispatches on extension, then samples and keywords the
// text into a bounded `Signal`. Files no family handles get the null signal.

use std::io::Cursor;
use std::panic::{self, AssertUnwindSafe};

use calamine::Reader;
use docx_rs::{DocumentChild, ParagraphChild, RunChild};

use crate::config::ClassifyConfig;
use crate::error::ExtractError;
use crate::keywords;
use crate::signal::{Signal, SignalKind};

/// One family of file formats.
pub trait ContentExtractor: Send + Sync {
    fn kind(&self) -> SignalKind;

    /// Lowercase extensions without the dot.
    fn extensions(&self) -> &[&str];

    /// Raw text for a file's bytes. `path` is only used in errors.
    fn extract(&self, path: &str, bytes: &[u8]) -> Result<String, ExtractError>;

    /// Whether partial content is still meaningful. Text formats are read up
    /// to the size limit; structured formats must be read whole.
    fn accepts_prefix(&self) -> bool {
        false
    }
}

/// Plain-text formats, decoded lossily as UTF-8.
pub struct TextExtractor;

impl ContentExtractor for TextExtractor {
    fn kind(&self) -> SignalKind {
        SignalKind::Text
    }

    fn extensions(&self) -> &[&str] {
        &[
            "txt", "md", "markdown", "rst", "csv", "tsv", "json", "yaml", "yml", "toml", "ini",
            "log", "xml", "html", "htm",
        ]
    }

    fn extract(&self, _path: &str, bytes: &[u8]) -> Result<String, ExtractError> {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn accepts_prefix(&self) -> bool {
        true
    }
}

/// Word documents: paragraph text in document order.
pub struct DocxExtractor;

impl ContentExtractor for DocxExtractor {
    fn kind(&self) -> SignalKind {
        SignalKind::Office
    }

    fn extensions(&self) -> &[&str] {
        &["docx"]
    }

    fn extract(&self, path: &str, bytes: &[u8]) -> Result<String, ExtractError> {
        let docx = docx_rs::read_docx(bytes).map_err(|e| ExtractError::corrupt(path, "docx", e))?;

        let mut paragraphs = Vec::new();
        for child in docx.document.children.iter() {
            if let DocumentChild::Paragraph(para) = child {
                let mut line = String::new();
                for pc in para.children.iter() {
                    if let ParagraphChild::Run(run) = pc {
                        for rc in run.children.iter() {
                            if let RunChild::Text(t) = rc {
                                line.push_str(&t.text);
                            }
                        }
                    }
                }
                if !line.is_empty() {
                    paragraphs.push(line);
                }
            }
        }
        Ok(paragraphs.join("\n"))
    }
}

/// Spreadsheets: sheet names and non-empty cell values, row by row.
pub struct SpreadsheetExtractor {
    /// Stop reading cells once this many characters are collected.
    pub budget: usize,
}

impl ContentExtractor for SpreadsheetExtractor {
    fn kind(&self) -> SignalKind {
        SignalKind::Office
    }

    fn extensions(&self) -> &[&str] {
        &["xlsx", "xlsm", "xls", "ods"]
    }

    fn extract(&self, path: &str, bytes: &[u8]) -> Result<String, ExtractError> {
        let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| ExtractError::corrupt(path, "spreadsheet", e))?;

        let mut out = String::new();
        'sheets: for name in workbook.sheet_names() {
            out.push_str(&name);
            out.push('\n');
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| ExtractError::corrupt(path, "spreadsheet", e))?;
            for row in range.rows() {
                let cells: Vec<String> = row
                    .iter()
                    .filter(|cell| !matches!(cell, calamine::Data::Empty))
                    .map(|cell| cell.to_string())
                    .collect();
                if !cells.is_empty() {
                    out.push_str(&cells.join(" "));
                    out.push('\n');
                }
                if out.len() >= self.budget {
                    break 'sheets;
                }
            }
        }
        Ok(out)
    }
}

/// PDF text layer.
pub struct PdfExtractor;

impl ContentExtractor for PdfExtractor {
    fn kind(&self) -> SignalKind {
        SignalKind::Pdf
    }

    fn extensions(&self) -> &[&str] {
        &["pdf"]
    }

    fn extract(&self, path: &str, bytes: &[u8]) -> Result<String, ExtractError> {
        // pdf-extract panics on some malformed inputs.
        match panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(ExtractError::corrupt(path, "pdf", e)),
            Err(_) => Err(ExtractError::corrupt(path, "pdf", "parser panicked")),
        }
    }
}

/// Basic facts about a decoded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub format: String,
    pub width: u32,
    pub height: u32,
}

impl ImageInfo {
    pub fn orientation(&self) -> &'static str {
        use std::cmp::Ordering;
        match self.width.cmp(&self.height) {
            Ordering::Greater => "landscape",
            Ordering::Less => "portrait",
            Ordering::Equal => "square",
        }
    }
}

/// Produces a textual description of an image for rule matching.
///
/// The default describes what can be read locally. A captioning model can
/// be plugged in through [`ImageExtractor::with_describer`].
pub trait ImageDescriber: Send + Sync {
    fn describe(&self, path: &str, info: &ImageInfo, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// Describes an image by format, size, orientation and file name words.
pub struct BasicImageDescriber;

impl ImageDescriber for BasicImageDescriber {
    fn describe(&self, path: &str, info: &ImageInfo, _bytes: &[u8]) -> Result<String, ExtractError> {
        let stem = std::path::Path::new(path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let words: Vec<String> = keywords::tokens(&stem).collect();
        Ok(format!(
            "image picture {} {}x{} {} {}",
            info.format,
            info.width,
            info.height,
            info.orientation(),
            words.join(" ")
        ))
    }
}

pub struct ImageExtractor {
    describer: Box<dyn ImageDescriber>,
}

impl ImageExtractor {
    pub fn new() -> Self {
        Self {
            describer: Box::new(BasicImageDescriber),
        }
    }

    pub fn with_describer(mut self, describer: impl ImageDescriber + 'static) -> Self {
        self.describer = Box::new(describer);
        self
    }
}

impl Default for ImageExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentExtractor for ImageExtractor {
    fn kind(&self) -> SignalKind {
        SignalKind::Image
    }

    fn extensions(&self) -> &[&str] {
        &["png", "jpg", "jpeg", "gif", "webp", "bmp", "tif", "tiff"]
    }

    fn extract(&self, path: &str, bytes: &[u8]) -> Result<String, ExtractError> {
        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| ExtractError::corrupt(path, "image", e))?;
        let format = reader
            .format()
            .and_then(|f| f.extensions_str().first().copied())
            .unwrap_or("unknown")
            .to_string();
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| ExtractError::corrupt(path, "image", e))?;
        let info = ImageInfo {
            format,
            width,
            height,
        };
        self.describer.describe(path, &info, bytes)
    }
}

/// Extractor registry, dispatching on file extension.
pub struct Extractors {
    families: Vec<Box<dyn ContentExtractor>>,
    max_signal_chars: usize,
    max_keywords: usize,
}

impl Extractors {
    /// Text, Word, spreadsheet, PDF and image families.
    pub fn standard(config: &ClassifyConfig) -> Self {
        Self::empty(config)
            .with_extractor(ImageExtractor::new())
            .with_extractor(PdfExtractor)
            .with_extractor(SpreadsheetExtractor {
                budget: config.max_signal_chars.saturating_mul(8),
            })
            .with_extractor(DocxExtractor)
            .with_extractor(TextExtractor)
    }

    /// No families; every file gets the null signal.
    pub fn empty(config: &ClassifyConfig) -> Self {
        Self {
            families: Vec::new(),
            max_signal_chars: config.max_signal_chars,
            max_keywords: config.max_keywords,
        }
    }

    /// Register a family. Later registrations take precedence for shared
    /// extensions.
    pub fn with_extractor(mut self, extractor: impl ContentExtractor + 'static) -> Self {
        self.families.insert(0, Box::new(extractor));
        self
    }

    /// The family handling `extension` (case-insensitive, no dot).
    pub fn family_for(&self, extension: &str) -> Option<&dyn ContentExtractor> {
        let ext = extension.to_lowercase();
        self.families
            .iter()
            .find(|f| f.extensions().contains(&ext.as_str()))
            .map(|f| f.as_ref())
    }

    /// Extract a bounded signal from a file's bytes.
    pub fn extract(&self, path: &str, extension: &str, bytes: &[u8]) -> Result<Signal, ExtractError> {
        let Some(family) = self.family_for(extension) else {
            return Ok(Signal::null());
        };
        let raw = family.extract(path, bytes)?;
        Ok(Signal::from_text(
            family.kind(),
            &raw,
            self.max_signal_chars,
            self.max_keywords,
        ))
    }
}
