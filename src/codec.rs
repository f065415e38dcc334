use anyhow::{Result, bail};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use opencv::core::Mat;
use opencv::imgcodecs;
use opencv::prelude::*;

/// 把图片字节解码为 3 通道 BGR 矩阵
///
/// `IMREAD_COLOR` 会把调色板/灰度图统一转换为 3 通道，
/// 避免非常规色彩模式导致后续特征提取失败
pub fn decode_image_bytes(bytes: &[u8]) -> Result<Mat> {
    let buf = Mat::from_slice(bytes)?;
    let img = imgcodecs::imdecode(&buf, imgcodecs::IMREAD_COLOR)?;
    // imdecode 解码失败时返回空矩阵而不是错误
    if img.empty() {
        bail!("buffer does not decode as an image");
    }
    Ok(img)
}

/// 解码 base64 或 data-URI 编码的图片
pub fn decode_base64_image(payload: &str) -> Result<Mat> {
    // data-URI 形如 `data:image/png;base64,<payload>`，只取第一个逗号之后的部分
    let encoded = match payload.split_once(',') {
        Some((_, b64)) => b64,
        None => payload,
    };
    let bytes = STANDARD.decode(encoded.trim())?;
    decode_image_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use opencv::core::{CV_8UC1, CV_8UC3, Scalar, Vector};

    use super::*;

    fn encoded_png(typ: i32) -> String {
        let mat = Mat::new_rows_cols_with_default(8, 8, typ, Scalar::all(128.0)).unwrap();
        let mut buf = Vector::new();
        imgcodecs::imencode(".png", &mat, &mut buf, &Vector::new()).unwrap();
        STANDARD.encode(buf.as_slice())
    }

    #[test]
    fn decode_raw_base64() {
        let img = decode_base64_image(&encoded_png(CV_8UC3)).unwrap();
        assert_eq!((img.rows(), img.cols(), img.channels()), (8, 8, 3));
    }

    #[test]
    fn decode_data_uri() {
        let payload = format!("data:image/png;base64,{}", encoded_png(CV_8UC3));
        let img = decode_base64_image(&payload).unwrap();
        assert_eq!((img.rows(), img.cols()), (8, 8));
    }

    #[test]
    fn grayscale_normalized_to_three_channels() {
        let img = decode_base64_image(&encoded_png(CV_8UC1)).unwrap();
        assert_eq!(img.channels(), 3);
    }

    #[test]
    fn invalid_base64_rejected() {
        assert!(decode_base64_image("this is not base64!!!").is_err());
    }

    #[test]
    fn non_image_bytes_rejected() {
        let payload = STANDARD.encode(b"hello world");
        assert!(decode_base64_image(&payload).is_err());
    }
}
