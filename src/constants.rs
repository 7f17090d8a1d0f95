//! Global constants for SpyLab

/// Decimals shown for similarity distances
pub const DEFAULT_DISTANCE_DECIMALS: u32 = 3;

/// Most decimals an `f64` distance can meaningfully show
pub const MAX_DISTANCE_DECIMALS: u32 = 15;

/// Maximum height of the analyzed image on screen, in pixels
pub const DEFAULT_MAX_DISPLAY_HEIGHT: u32 = 500;

/// Result rows per page
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Backend used when no configuration exists
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Border width of an unselected face box
pub const BOX_STROKE: u32 = 1;

/// Border width of the selected face box
pub const STRONG_BOX_STROKE: u32 = 3;
