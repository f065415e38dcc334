use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use futures::{FutureExt, StreamExt, stream};
use log::{debug, error, info, warn};
use serde::Deserialize;
use serde_json::json;
use tokio::task::block_in_place;

use crate::codec;
use crate::config::MediaStoreOptions;
use crate::gallery::{Gallery, GalleryEntry};
use crate::vision::FaceEncoder;

/// 同时下载的资源数量
const DOWNLOAD_CONCURRENCY: usize = 4;

/// 远端搜索接口返回的单个资源
#[derive(Debug, Clone, Deserialize)]
pub struct Resource {
    pub public_id: String,
    #[serde(default)]
    pub secure_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub context: Option<ResourceContext>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceContext {
    #[serde(default)]
    pub custom: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    resources: Vec<Resource>,
}

impl Resource {
    /// 优先使用 https 地址，退回 http 地址，空字符串视为缺失
    pub fn download_url(&self) -> Option<&str> {
        self.secure_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .or_else(|| self.url.as_deref().filter(|url| !url.is_empty()))
    }

    /// 显示名称：优先取自定义元数据中的 name，否则取 public_id 的最后一段
    pub fn display_name(&self) -> String {
        if let Some(context) = &self.context {
            if let Some(name) = context.custom.get("name") {
                if !name.is_empty() {
                    return name.clone();
                }
            }
        }
        match self.public_id.rsplit_once('/') {
            Some((_, base)) => base.to_string(),
            None => self.public_id.clone(),
        }
    }
}

/// 远端媒体库客户端，按文件夹拉取人脸图库
pub struct MediaStore {
    client: reqwest::Client,
    opts: MediaStoreOptions,
}

impl MediaStore {
    pub fn new(opts: MediaStoreOptions) -> Self {
        // 不设置请求超时，下游挂起只会阻塞当前请求所在的任务
        Self { client: reqwest::Client::new(), opts }
    }

    /// 搜索配置文件夹下的全部资源，附带自定义元数据
    pub async fn search_resources(&self) -> Result<Vec<Resource>> {
        let url = format!("{}/v1_1/{}/resources/search", self.opts.api_base, self.opts.cloud_name);
        let body = json!({
            "expression": format!("folder:{}", self.opts.folder),
            "max_results": self.opts.max_results,
            "with_field": ["context"],
        });
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.opts.api_key, Some(&self.opts.api_secret))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<SearchResponse>()
            .await?;
        Ok(response.resources)
    }

    /// 加载整个人脸图库
    ///
    /// 单个资源失败只会跳过该资源，搜索本身失败则返回空图库，
    /// 两种情况都记录日志，函数本身不失败
    pub async fn load_gallery(&self, encoder: &FaceEncoder) -> Gallery {
        info!("正在从远端拉取人脸图库: {}", self.opts.folder);
        let resources = match self.search_resources().await {
            Ok(resources) => resources,
            Err(e) => {
                error!("搜索远端图库失败: {e:#}");
                return Gallery::default();
            }
        };

        // 下载流水线化，buffered 保证结果顺序与搜索返回顺序一致
        let mut entries = Vec::new();
        let mut results = stream::iter(resources)
            .map(|resource| {
                let public_id = resource.public_id.clone();
                self.load_entry(encoder, resource).map(|result| (public_id, result))
            })
            .buffered(DOWNLOAD_CONCURRENCY);
        while let Some((public_id, result)) = results.next().await {
            match result {
                Ok(Some(entry)) => {
                    info!("已加载人脸: {} ({public_id})", entry.name);
                    entries.push(entry);
                }
                Ok(None) => {}
                Err(e) => warn!("处理资源 {public_id} 失败: {e:#}"),
            }
        }
        Gallery::from(entries)
    }

    /// 处理单个资源，没有可用地址或未检测到人脸时返回 None
    async fn load_entry(
        &self,
        encoder: &FaceEncoder,
        resource: Resource,
    ) -> Result<Option<GalleryEntry>> {
        let Some(url) = resource.download_url() else {
            debug!("资源 {} 没有可下载地址，跳过", resource.public_id);
            return Ok(None);
        };

        let bytes = self.fetch_bytes(url).await.context("下载失败")?;
        let embedding = block_in_place(|| -> Result<_> {
            let img = codec::decode_image_bytes(&bytes)?;
            let embeddings = encoder.detect_and_embed(&img)?;
            // 图库图片默认单人，只取第一张人脸
            Ok(embeddings.into_iter().next())
        })?;

        match embedding {
            Some(embedding) => {
                Ok(Some(GalleryEntry { name: resource.display_name(), embedding }))
            }
            None => {
                // 文件夹里允许混入非人脸图片，不算错误
                debug!("资源 {} 未检测到人脸，跳过", resource.public_id);
                Ok(None)
            }
        }
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            bail!("响应体为空");
        }
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn resource(json: serde_json::Value) -> Resource {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn parse_search_response() {
        let raw = r#"{
            "total_count": 2,
            "resources": [
                {
                    "public_id": "members/alice",
                    "secure_url": "https://cdn.example.com/members/alice.jpg",
                    "url": "http://cdn.example.com/members/alice.jpg",
                    "context": {"custom": {"name": "Alice"}}
                },
                {"public_id": "members/bob"}
            ]
        }"#;
        let response: SearchResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.resources.len(), 2);
        assert_eq!(response.resources[0].display_name(), "Alice");
        assert_eq!(response.resources[1].display_name(), "bob");
        assert!(response.resources[1].download_url().is_none());
    }

    #[test]
    fn parse_empty_response() {
        let response: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(response.resources.is_empty());
    }

    #[rstest]
    #[case::secure_preferred(
        json!({"public_id": "a", "secure_url": "https://x/a", "url": "http://x/a"}),
        Some("https://x/a")
    )]
    #[case::fallback_to_url(json!({"public_id": "a", "url": "http://x/a"}), Some("http://x/a"))]
    #[case::empty_secure_url_falls_back(
        json!({"public_id": "a", "secure_url": "", "url": "http://x/a"}),
        Some("http://x/a")
    )]
    #[case::empty_url_skipped(json!({"public_id": "a", "secure_url": ""}), None)]
    #[case::no_url(json!({"public_id": "a"}), None)]
    fn download_url_preference(#[case] raw: serde_json::Value, #[case] expected: Option<&str>) {
        assert_eq!(resource(raw).download_url(), expected);
    }

    #[rstest]
    #[case::context_name(
        json!({"public_id": "members/img_01", "context": {"custom": {"name": "Alice"}}}),
        "Alice"
    )]
    #[case::empty_context_name_falls_back(
        json!({"public_id": "members/img_01", "context": {"custom": {"name": ""}}}),
        "img_01"
    )]
    #[case::basename_of_public_id(json!({"public_id": "members/john_doe"}), "john_doe")]
    #[case::public_id_without_folder(json!({"public_id": "john_doe"}), "john_doe")]
    fn display_name_precedence(#[case] raw: serde_json::Value, #[case] expected: &str) {
        assert_eq!(resource(raw).display_name(), expected);
    }
}
