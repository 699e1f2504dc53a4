/// Matches the `/api/v1` prefix the recognition backend mounts its routes under.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";

pub const CAPTURE_INTERVAL_MS: u64 = 3000;

/// Upper bound on any single backend request; comparable to the tick interval
/// so a hung request cannot pile up behind many ticks.
pub const REQUEST_TIMEOUT_MS: u64 = 3000;

pub const CAPTURE_WIDTH: u32 = 640;
pub const CAPTURE_HEIGHT: u32 = 480;
pub const JPEG_QUALITY: u8 = 90;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

pub const FRAME_FILE_NAME: &str = "frame.jpg";
pub const FRAME_MIME_TYPE: &str = "image/jpeg";
