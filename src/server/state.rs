use std::sync::Arc;

use tokio::sync::RwLock;

use crate::fetcher::MediaStore;
use crate::gallery::Gallery;
use crate::metrics;
use crate::vision::FaceEncoder;

/// 应用状态
pub struct AppState {
    /// 当前人脸图库快照
    gallery: RwLock<Arc<Gallery>>,
    /// 远端媒体库客户端
    pub store: MediaStore,
    /// 人脸特征提取器
    pub encoder: FaceEncoder,
    /// 比对容差
    pub tolerance: f32,
    /// 允许跨域的来源
    pub allowed_origins: Vec<String>,
}

impl AppState {
    pub fn new(
        store: MediaStore,
        encoder: FaceEncoder,
        tolerance: f32,
        allowed_origins: Vec<String>,
    ) -> Arc<Self> {
        Arc::new(AppState {
            gallery: RwLock::new(Arc::new(Gallery::default())),
            store,
            encoder,
            tolerance,
            allowed_origins,
        })
    }

    /// 取当前图库快照，读请求不会观察到构建中的图库
    pub async fn current_gallery(&self) -> Arc<Gallery> {
        self.gallery.read().await.clone()
    }

    /// 重建图库并原子地替换快照，返回新图库大小
    ///
    /// NOTE: 新图库在锁外构建完成后才发布，并发的识别请求
    /// 在此期间继续使用旧快照
    pub async fn refresh_gallery(&self) -> usize {
        let fresh = Arc::new(self.store.load_gallery(&self.encoder).await);
        let count = fresh.len();
        *self.gallery.write().await = fresh;
        metrics::set_gallery_size(count);
        count
    }
}
