use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::error;
use serde_json::json;

/// API 错误类型，每个分类对应一个状态码和固定文案
pub enum ApiError {
    /// 请求里没有图片
    NoImage,
    /// 图片数据无法解码
    InvalidImage(String),
    /// 图里没有检测到人脸
    NoFaceDetected,
    /// 检测到人脸但图库里没有匹配
    NotRecognized,
    /// 其他所有错误
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NoImage => StatusCode::BAD_REQUEST,
            Self::InvalidImage(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::NoFaceDetected | Self::NotRecognized => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::NoImage => "No image provided".to_string(),
            Self::InvalidImage(cause) => format!("Invalid image data: {cause}"),
            Self::NoFaceDetected => "No face detected".to_string(),
            Self::NotRecognized => "Face not recognized".to_string(),
            Self::Internal(e) => e.to_string(),
        }
    }

    /// 指标用的结果标签
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::NoImage => "no_image",
            Self::InvalidImage(_) => "invalid_image",
            Self::NoFaceDetected => "no_face",
            Self::NotRecognized => "no_match",
            Self::Internal(_) => "error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(e) = &self {
            error!("请求处理失败: {e:#}");
        }
        let body = json!({"success": false, "message": self.message()});
        (self.status(), Json(body)).into_response()
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Internal(err.into())
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(ApiError::NoImage.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::InvalidImage("x".into()).status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(ApiError::NoFaceDetected.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::NotRecognized.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn distinct_not_found_messages() {
        assert_ne!(ApiError::NoFaceDetected.message(), ApiError::NotRecognized.message());
    }

    #[test]
    fn internal_error_message_surfaced() {
        assert_eq!(ApiError::Internal(anyhow::anyhow!("boom")).message(), "boom");
    }
}
