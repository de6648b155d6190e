use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, RgbaImage};
use pdfium_render::prelude::*;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::{image_file_name, ConversionError, PdfConverter, PNG_CONTENT_TYPE};
use crate::storage::UploadFile;

/// Pending renders beyond this make callers wait.
const RENDER_QUEUE_DEPTH: usize = 32;

struct RenderJob {
    pdf: Bytes,
    reply: oneshot::Sender<Result<Vec<u8>, ConversionError>>,
}

/// Renders the first PDF page with PDFium.
///
/// PDFium keeps process-wide state that must be initialized once and torn
/// down once. The library is bound a single time on a dedicated OS thread
/// that owns it for the life of the converter; conversions are sent to that
/// thread over a channel and rendered one at a time.
#[derive(Debug, Clone)]
pub struct PdfiumConverter {
    jobs: mpsc::Sender<RenderJob>,
}

impl PdfiumConverter {
    /// Binds PDFium (from `library_path`, or the system library) on the render
    /// thread. Fails if the library cannot be loaded.
    pub async fn start(library_path: Option<String>, scale: f32) -> Result<Self, ConversionError> {
        let (ready_tx, ready_rx) = oneshot::channel();

        let jobs = spawn_render_thread(move |queue| {
            let pdfium = match bind_pdfium(library_path.as_deref()) {
                Ok(pdfium) => {
                    let _ = ready_tx.send(Ok(()));
                    pdfium
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            serve(queue, |pdf| render_first_page(&pdfium, pdf, scale));
        })?;

        ready_rx.await.map_err(|_| ConversionError::Stopped)??;
        info!("PDFium bound on render thread");
        Ok(Self { jobs })
    }
}

#[async_trait]
impl PdfConverter for PdfiumConverter {
    async fn convert_to_image(&self, file: &UploadFile) -> Result<UploadFile, ConversionError> {
        let (reply, rendered) = oneshot::channel();
        self.jobs
            .send(RenderJob {
                pdf: file.bytes.clone(),
                reply,
            })
            .await
            .map_err(|_| ConversionError::Stopped)?;

        let png = rendered.await.map_err(|_| ConversionError::Stopped)??;

        debug!("Rendered {} to {} PNG bytes", file.name, png.len());

        Ok(UploadFile::new(
            image_file_name(&file.name),
            PNG_CONTENT_TYPE,
            Bytes::from(png),
        ))
    }
}

fn spawn_render_thread(
    run: impl FnOnce(mpsc::Receiver<RenderJob>) + Send + 'static,
) -> Result<mpsc::Sender<RenderJob>, ConversionError> {
    let (jobs, queue) = mpsc::channel(RENDER_QUEUE_DEPTH);
    std::thread::Builder::new()
        .name("pdfium-render".to_string())
        .spawn(move || run(queue))
        .map_err(|e| ConversionError::Library(format!("cannot start render thread: {e}")))?;
    Ok(jobs)
}

/// Runs until every sender is dropped.
fn serve(
    mut queue: mpsc::Receiver<RenderJob>,
    render: impl Fn(&[u8]) -> Result<Vec<u8>, ConversionError>,
) {
    while let Some(job) = queue.blocking_recv() {
        // The caller may have gone away; nothing to report then.
        let _ = job.reply.send(render(&job.pdf));
    }
    debug!("PDF render thread stopping");
}

fn bind_pdfium(library_path: Option<&str>) -> Result<Pdfium, ConversionError> {
    let bindings = match library_path {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| ConversionError::Library(e.to_string()))?;
    Ok(Pdfium::new(bindings))
}

fn render_first_page(pdfium: &Pdfium, pdf: &[u8], scale: f32) -> Result<Vec<u8>, ConversionError> {
    let document = pdfium
        .load_pdf_from_byte_slice(pdf, None)
        .map_err(|e| ConversionError::Render(e.to_string()))?;

    let pages = document.pages();
    if pages.len() == 0 {
        return Err(ConversionError::EmptyDocument);
    }
    let page = pages
        .first()
        .map_err(|e| ConversionError::Render(e.to_string()))?;

    let bitmap = page
        .render_with_config(&PdfRenderConfig::new().scale_page_by_factor(scale))
        .map_err(|e| ConversionError::Render(e.to_string()))?;

    let width = bitmap.width() as u32;
    let height = bitmap.height() as u32;
    let rgba = RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes()).ok_or_else(|| {
        ConversionError::Render(format!("bitmap buffer does not match {width}x{height}"))
    })?;

    let mut png = Vec::new();
    DynamicImage::ImageRgba8(rgba).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    fn with_renderer(
        render: impl Fn(&[u8]) -> Result<Vec<u8>, ConversionError> + Send + 'static,
    ) -> PdfiumConverter {
        let jobs = spawn_render_thread(move |queue| serve(queue, render)).unwrap();
        PdfiumConverter { jobs }
    }

    fn pdf(name: &str, bytes: &'static [u8]) -> UploadFile {
        UploadFile::new(name, "application/pdf", Bytes::from_static(bytes))
    }

    #[tokio::test]
    async fn test_missing_library_fails_at_start() {
        let result = PdfiumConverter::start(Some("/nonexistent/pdfium".to_string()), 1.0).await;
        assert!(matches!(result, Err(ConversionError::Library(_))));
    }

    #[tokio::test]
    async fn test_rendered_page_becomes_png_upload() {
        let converter = with_renderer(|pdf| {
            assert!(pdf.starts_with(b"%PDF-"));
            Ok(b"\x89PNG".to_vec())
        });

        let image = converter
            .convert_to_image(&pdf("cv.pdf", b"%PDF-1.7"))
            .await
            .unwrap();

        assert_eq!(image.name, "cv.png");
        assert_eq!(image.content_type, PNG_CONTENT_TYPE);
        assert_eq!(image.bytes, Bytes::from_static(b"\x89PNG"));
    }

    #[tokio::test]
    async fn test_render_error_is_returned_to_caller() {
        let converter = with_renderer(|_| Err(ConversionError::EmptyDocument));

        let result = converter.convert_to_image(&pdf("cv.pdf", b"%PDF-")).await;
        assert!(matches!(result, Err(ConversionError::EmptyDocument)));
    }

    #[tokio::test]
    async fn test_concurrent_conversions_share_one_render_thread() {
        let renders = Arc::new(AtomicUsize::new(0));
        let counter = renders.clone();
        let converter = with_renderer(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1])
        });

        let (a, b) = (pdf("a.pdf", b"%PDF-a"), pdf("b.pdf", b"%PDF-b"));
        let (first, second) =
            tokio::join!(converter.convert_to_image(&a), converter.convert_to_image(&b));

        assert_eq!(first.unwrap().name, "a.png");
        assert_eq!(second.unwrap().name, "b.png");
        assert_eq!(renders.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stopped_render_thread_is_an_error() {
        let (jobs, queue) = mpsc::channel(1);
        drop(queue);
        let converter = PdfiumConverter { jobs };

        let result = converter.convert_to_image(&pdf("cv.pdf", b"%PDF-")).await;
        assert!(matches!(result, Err(ConversionError::Stopped)));
    }
}
