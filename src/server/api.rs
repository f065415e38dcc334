use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::State;
use chrono::Utc;
use log::info;
use tokio::task::block_in_place;

use super::error::{ApiError, Result};
use super::state::AppState;
use super::types::*;
use crate::codec;
use crate::metrics;

/// 识别上传图片中的人脸
#[utoipa::path(
    post,
    path = "/recognize-face",
    request_body = RecognizeRequest,
    responses(
        (status = 200, body = RecognizeResponse),
        (status = 400, description = "请求里没有图片"),
        (status = 404, description = "没有检测到人脸，或者图库里没有匹配"),
        (status = 415, description = "图片数据无法解码"),
    )
)]
pub async fn recognize_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecognizeRequest>,
) -> Result<Json<RecognizeResponse>> {
    let start = Instant::now();
    let result = do_recognize(&state, request).await;
    metrics::observe_recognize_duration(start.elapsed().as_secs_f64());
    match &result {
        Ok(_) => metrics::inc_recognize("matched"),
        Err(e) => metrics::inc_recognize(e.outcome()),
    }
    result
}

async fn do_recognize(
    state: &AppState,
    request: RecognizeRequest,
) -> Result<Json<RecognizeResponse>> {
    let payload =
        request.image.as_deref().filter(|image| !image.is_empty()).ok_or(ApiError::NoImage)?;

    let image = block_in_place(|| codec::decode_base64_image(payload))
        .map_err(|e| ApiError::InvalidImage(e.to_string()))?;

    let embeddings = block_in_place(|| state.encoder.detect_and_embed(&image))?;
    // 查询图片可能包含多张人脸，只用第一张
    let Some(query) = embeddings.into_iter().next() else {
        return Err(ApiError::NoFaceDetected);
    };

    let gallery = state.current_gallery().await;
    let name = gallery.recognize(&query, state.tolerance).ok_or(ApiError::NotRecognized)?;

    info!("识别成功: {name}");
    Ok(Json(RecognizeResponse {
        success: true,
        member: MemberInfo { name: name.to_string(), last_visit: Utc::now().to_rfc3339() },
    }))
}

/// 重新拉取远端图库并替换当前快照
#[utoipa::path(
    post,
    path = "/refresh-faces",
    responses(
        (status = 200, body = RefreshResponse),
    )
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RefreshResponse>> {
    let count = state.refresh_gallery().await;
    info!("图库刷新完成，共 {count} 张人脸");
    Ok(Json(RefreshResponse { success: true, count }))
}

/// 健康检查
#[utoipa::path(
    get,
    path = "/test",
    responses(
        (status = 200, body = TestResponse),
    )
)]
pub async fn test_handler(State(state): State<Arc<AppState>>) -> Json<TestResponse> {
    Json(TestResponse {
        status: "ok".to_string(),
        message: "Face recognition service is running".to_string(),
        time: Utc::now().to_rfc3339(),
        allowed_origins: state.allowed_origins.clone(),
    })
}
