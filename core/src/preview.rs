use std::sync::Arc;

use async_trait::async_trait;

use crate::catalog::RemoteImage;
use crate::error::Result;
use crate::preview_cache::PreviewCache;
use crate::rasterizer::CellSize;
use crate::rasterizer::Rasterizer;

/// Produces the text shown in the preview pane for one image.
#[async_trait]
pub trait PreviewSource: Send + Sync {
    async fn preview(&self, image: &RemoteImage, size: CellSize) -> Result<String>;
}

/// Thumbnail cache followed by rasterization.
pub struct PreviewPipeline {
    cache: Arc<PreviewCache>,
    rasterizer: Rasterizer,
}

impl PreviewPipeline {
    pub fn new(cache: Arc<PreviewCache>, rasterizer: Rasterizer) -> Self {
        Self { cache, rasterizer }
    }
}

#[async_trait]
impl PreviewSource for PreviewPipeline {
    async fn preview(&self, image: &RemoteImage, size: CellSize) -> Result<String> {
        let path = self.cache.ensure_thumbnail(image).await?;
        self.rasterizer.render(&path, size).await
    }
}
