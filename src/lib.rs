pub mod agenda {
    pub mod aggregation;
    pub mod export;
    pub mod locale;
    pub mod model;
    pub mod stats;
}
pub mod config {
    pub mod env_loader;
    pub mod model;
}
pub mod dashboard;
pub mod firebase {
    pub mod api;
    pub mod dto;
    pub mod sse;
}
pub mod gemini {
    pub mod api;
}
pub mod geocoding {
    pub mod api;
}
pub mod places;
pub mod tracing;
