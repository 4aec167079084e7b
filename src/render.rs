use anyhow::{bail, Context, Result};
use mupdf::{Colorspace, Document, Matrix};

/// A rasterized page, packed as RGBA8888 rows with no padding.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl PageImage {
    pub fn row_bytes(&self) -> usize {
        self.width as usize * 4
    }
}

/// An open document that pages can be rasterized from.
pub struct PageSource {
    doc: Document,
    page_count: i32,
    path: String,
}

impl PageSource {
    pub fn open(path: &str) -> Result<Self> {
        let doc =
            Document::open(path).with_context(|| format!("cannot open document: {}", path))?;
        let page_count = doc.page_count().context("cannot count pages")?;
        log::info!("Opened {} ({} page(s))", path, page_count);
        Ok(Self {
            doc,
            page_count,
            path: path.to_string(),
        })
    }

    pub fn page_count(&self) -> i32 {
        self.page_count
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// File name of the document, for window titles and the overlay.
    pub fn display_name(&self) -> &str {
        std::path::Path::new(&self.path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.path)
    }

    /// Rasterize a 0-based page at `zoom` percent, rotated by `rotate` degrees.
    pub fn rasterize(&self, page: i32, zoom: f32, rotate: f32) -> Result<PageImage> {
        check_page_range(page, self.page_count)?;

        let ctm = page_transform(zoom, rotate);
        let pixmap = self
            .doc
            .load_page(page)
            .and_then(|p| p.to_pixmap(&ctm, &Colorspace::device_rgb(), false, true))
            .with_context(|| format!("cannot create pixmap for page {}", page + 1))?;

        let width = pixmap.width();
        let height = pixmap.height();
        let rgba = expand_to_rgba(pixmap.samples(), width, height, pixmap.n() as usize)
            .with_context(|| format!("unexpected pixmap layout for page {}", page + 1))?;

        log::info!(
            "Rendered page {}/{} at {}% rotated {}: {}x{} px",
            page + 1,
            self.page_count,
            zoom,
            rotate,
            width,
            height
        );

        Ok(PageImage {
            width,
            height,
            rgba,
        })
    }
}

pub fn check_page_range(page: i32, page_count: i32) -> Result<()> {
    if page < 0 || page >= page_count {
        bail!(
            "page number out of range: {} (document has {} page(s))",
            i64::from(page) + 1,
            page_count
        );
    }
    Ok(())
}

/// Scale by `zoom / 100`, then rotate by `rotate` degrees.
pub fn page_transform(zoom: f32, rotate: f32) -> Matrix {
    let scale = zoom / 100.0;
    let mut ctm = Matrix::new_scale(scale, scale);
    if rotate != 0.0 {
        ctm.concat(Matrix::new_rotate(rotate));
    }
    ctm
}

/// Convert `n`-component pixmap samples to RGBA8888.
///
/// The row stride is derived from the buffer length, so padded rows are
/// handled. Sources without alpha get an opaque alpha channel.
pub fn expand_to_rgba(samples: &[u8], width: u32, height: u32, n: usize) -> Result<Vec<u8>> {
    let (w, h) = (width as usize, height as usize);
    if w == 0 || h == 0 {
        return Ok(Vec::new());
    }
    if !(1..=4).contains(&n) {
        bail!("unsupported component count {}", n);
    }
    let stride = samples.len() / h;
    if stride < w * n {
        bail!(
            "pixmap buffer too small: {} bytes for {}x{}x{}",
            samples.len(),
            w,
            h,
            n
        );
    }

    let mut out = Vec::with_capacity(w * h * 4);
    for row in samples.chunks_exact(stride).take(h) {
        for px in row[..w * n].chunks_exact(n) {
            match n {
                1 | 2 => out.extend_from_slice(&[px[0], px[0], px[0]]),
                _ => out.extend_from_slice(&px[..3]),
            }
            out.push(if n == 2 || n == 4 { px[n - 1] } else { 255 });
        }
    }
    Ok(out)
}
