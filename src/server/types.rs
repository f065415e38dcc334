use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 识别请求
#[derive(Debug, Deserialize, ToSchema)]
pub struct RecognizeRequest {
    /// base64 或 data-URI 编码的图片
    #[serde(default)]
    pub image: Option<String>,
}

/// 识别出的成员信息
#[derive(Debug, Serialize, ToSchema)]
pub struct MemberInfo {
    pub name: String,
    /// 本次识别时间，RFC 3339 格式
    #[serde(rename = "lastVisit")]
    pub last_visit: String,
}

/// 识别成功响应
#[derive(Debug, Serialize, ToSchema)]
pub struct RecognizeResponse {
    pub success: bool,
    pub member: MemberInfo,
}

/// 图库刷新响应
#[derive(Debug, Serialize, ToSchema)]
pub struct RefreshResponse {
    pub success: bool,
    /// 刷新后的图库人脸数量
    pub count: usize,
}

/// 健康检查响应
#[derive(Debug, Serialize, ToSchema)]
pub struct TestResponse {
    pub status: String,
    pub message: String,
    pub time: String,
    pub allowed_origins: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_info_uses_camel_case_last_visit() {
        let info = MemberInfo { name: "Alice".into(), last_visit: "2026-01-01T00:00:00Z".into() };
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["name"], "Alice");
        assert_eq!(value["lastVisit"], "2026-01-01T00:00:00Z");
    }

    #[test]
    fn missing_image_field_deserializes_to_none() {
        let req: RecognizeRequest = serde_json::from_str("{}").unwrap();
        assert!(req.image.is_none());
    }
}
