use kolam_render::RenderError;

/// Errors produced by the high-level pipeline helpers.
///
/// Empty detections and exhausted time budgets are not errors; they show up
/// as empty dot/path lists in the analysis instead.
#[derive(thiserror::Error, Debug)]
pub enum KolamError {
    #[error("failed to decode image: {0}")]
    ImageDecode(#[source] image::ImageError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("invalid grid {rows}x{cols}: rows and cols must lie in [{min}, {max}]")]
    InvalidGrid {
        rows: u32,
        cols: u32,
        min: u32,
        max: u32,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
