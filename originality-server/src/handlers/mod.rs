//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod health;
pub mod image;
pub mod text;
pub mod video;

pub use crate::state::AppState;
pub use health::{health, ready, FingerprintCounts, HealthResponse, ReadyResponse};
pub use image::{
    image_check_handler, image_register_handler, ImageCheckResponse, ImageRegisterResponse,
};
pub use text::{
    text_check_handler, text_register_handler, TextCheckResponse, TextCriteria,
    TextRegisterResponse,
};
pub use video::{
    video_check_handler, video_register_handler, AudioMatchBody, VideoCheckResponse,
    VideoRegisterDetails, VideoRegisterResponse,
};
