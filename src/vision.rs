use std::fs;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use log::info;
use opencv::core::{Mat, Ptr, Size};
use opencv::objdetect::{FaceDetectorYN, FaceRecognizerSF};
use opencv::prelude::*;

use crate::config::MatchOptions;

/// YuNet 人脸检测模型
pub const DETECTOR_MODEL: &str = "face_detection_yunet_2023mar.onnx";
/// SFace 人脸识别模型
pub const RECOGNIZER_MODEL: &str = "face_recognition_sface_2021dec.onnx";

const MODEL_URLS: &[(&str, &str)] = &[
    (
        DETECTOR_MODEL,
        "https://github.com/opencv/opencv_zoo/raw/main/models/face_detection_yunet/face_detection_yunet_2023mar.onnx",
    ),
    (
        RECOGNIZER_MODEL,
        "https://github.com/opencv/opencv_zoo/raw/main/models/face_recognition_sface/face_recognition_sface_2021dec.onnx",
    ),
];

/// 人脸特征向量，128 维，提取时做 L2 归一化
///
/// 归一化之后，两个特征的欧氏距离即 SFace 标准的 `FR_NORM_L2` 比对度量
#[derive(Debug, Clone, PartialEq)]
pub struct FaceEmbedding(pub(crate) Vec<f32>);

impl FaceEmbedding {
    pub fn from_raw(values: &[f32]) -> Self {
        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            Self(values.iter().map(|v| v / norm).collect())
        } else {
            Self(values.to_vec())
        }
    }

    /// 计算与另一个特征的欧氏距离
    pub fn distance(&self, other: &Self) -> f32 {
        self.0.iter().zip(&other.0).map(|(a, b)| (a - b) * (a - b)).sum::<f32>().sqrt()
    }

    /// 距离在容差内即认为是同一个人
    pub fn matches(&self, other: &Self, tolerance: f32) -> bool {
        self.distance(other) <= tolerance
    }
}

/// 下载缺失的 ONNX 模型文件
pub async fn ensure_models(opts: &MatchOptions) -> Result<()> {
    fs::create_dir_all(&opts.model_dir)?;
    for (file, url) in MODEL_URLS {
        let path = opts.model_dir.join(file);
        if path.exists() {
            continue;
        }
        info!("正在下载模型 {file}...");
        let bytes = reqwest::get(*url).await?.error_for_status()?.bytes().await?;
        // 先写入临时文件再改名，避免留下损坏的模型
        let tmp = path.with_extension("onnx.tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, &path)?;
        info!("模型 {file} 下载完成");
    }
    Ok(())
}

/// 人脸特征提取器，封装 YuNet 检测 + SFace 特征提取
pub struct FaceEncoder {
    inner: Mutex<Inner>,
}

struct Inner {
    detector: Ptr<FaceDetectorYN>,
    recognizer: Ptr<FaceRecognizerSF>,
}

// SAFETY: OpenCV 的智能指针内部没有同步机制，Inner 只会在持有 Mutex 的线程上被访问
unsafe impl Send for Inner {}

impl FaceEncoder {
    pub fn new(opts: &MatchOptions) -> Result<Self> {
        let detector = FaceDetectorYN::create(
            &model_path(&opts.model_dir, DETECTOR_MODEL)?,
            "",
            Size::new(320, 320),
            0.9,
            0.3,
            5000,
            0,
            0,
        )?;
        let recognizer =
            FaceRecognizerSF::create_def(&model_path(&opts.model_dir, RECOGNIZER_MODEL)?, "")?;
        Ok(Self { inner: Mutex::new(Inner { detector, recognizer }) })
    }

    /// 检测图中所有人脸并提取特征，返回顺序与检测结果一致
    pub fn detect_and_embed(&self, image: &Mat) -> Result<Vec<FaceEmbedding>> {
        let mut inner = self.inner.lock().map_err(|_| anyhow!("人脸特征提取器锁中毒"))?;
        inner.detect_and_embed(image)
    }
}

impl Inner {
    fn detect_and_embed(&mut self, image: &Mat) -> Result<Vec<FaceEmbedding>> {
        self.detector.set_input_size(image.size()?)?;
        let mut faces = Mat::default();
        self.detector.detect(image, &mut faces)?;

        let mut embeddings = Vec::with_capacity(faces.rows() as usize);
        for i in 0..faces.rows() {
            let mut aligned = Mat::default();
            self.recognizer.align_crop(image, &faces.row(i)?, &mut aligned)?;
            let mut feature = Mat::default();
            self.recognizer.feature(&aligned, &mut feature)?;
            // feature 指向识别器的内部缓冲区，下一次调用会覆盖，必须立即拷贝
            embeddings.push(FaceEmbedding::from_raw(feature.data_typed::<f32>()?));
        }
        Ok(embeddings)
    }
}

fn model_path(dir: &Path, file: &str) -> Result<String> {
    let path = dir.join(file);
    Ok(path.to_str().with_context(|| format!("模型路径不是合法 UTF-8: {}", path.display()))?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_normalized() {
        let emb = FaceEmbedding::from_raw(&[3.0, 4.0]);
        assert_eq!(emb.0, vec![0.6, 0.8]);
    }

    #[test]
    fn embedding_zero_vector_unchanged() {
        let emb = FaceEmbedding::from_raw(&[0.0, 0.0]);
        assert_eq!(emb.0, vec![0.0, 0.0]);
    }

    #[test]
    fn distance_to_self_is_zero() {
        let emb = FaceEmbedding::from_raw(&[1.0, 2.0, 2.0]);
        assert_eq!(emb.distance(&emb), 0.0);
    }

    #[test]
    fn matches_on_boundary() {
        let a = FaceEmbedding(vec![0.0, 0.0]);
        let b = FaceEmbedding(vec![0.5, 0.0]);
        assert!(a.matches(&b, 0.5));
        assert!(!a.matches(&b, 0.4));
    }
}
