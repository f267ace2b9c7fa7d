use bytes::Bytes;
use rust_embed::RustEmbed;

use crate::errors::{AppError, AppResult};

pub const DEFAULT_AVATAR_PATH: &str = "default.png";

/// Embedded image assets
#[derive(RustEmbed)]
#[folder = "assets/"]
pub struct AvatarAssets;

impl AvatarAssets {
    /// The static avatar served when no other source has an image
    pub fn default_avatar() -> AppResult<Bytes> {
        Self::get(DEFAULT_AVATAR_PATH)
            .map(|file| Bytes::from(file.data.into_owned()))
            .ok_or_else(|| {
                AppError::internal(format!("Embedded asset {} is missing", DEFAULT_AVATAR_PATH))
            })
    }
}
