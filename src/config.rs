use std::path::PathBuf;
use std::sync::LazyLock;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use crate::cli::*;

static CONF_DIR: LazyLock<PathBuf> = LazyLock::new(|| {
    let proj_dirs = ProjectDirs::from("", "", "facegate").expect("failed to get project dir");
    proj_dirs.config_dir().to_path_buf()
});

fn default_model_dir() -> &'static str {
    CONF_DIR.to_str().unwrap()
}

/// 远端媒体库（Cloudinary 风格搜索接口）配置
#[derive(Parser, Debug, Clone)]
pub struct MediaStoreOptions {
    /// 媒体库云名称
    #[arg(long, value_name = "NAME", env = "CLOUDINARY_CLOUD_NAME")]
    pub cloud_name: String,
    /// 媒体库 API Key
    #[arg(long, value_name = "KEY", env = "CLOUDINARY_API_KEY")]
    pub api_key: String,
    /// 媒体库 API Secret
    #[arg(long, value_name = "SECRET", env = "CLOUDINARY_API_SECRET", hide_env_values = true)]
    pub api_secret: String,
    /// 人脸图库所在的远端文件夹
    #[arg(long, value_name = "FOLDER", env = "CLOUDINARY_FOLDER", default_value = "members")]
    pub folder: String,
    /// 搜索接口基址
    #[arg(
        long,
        value_name = "URL",
        env = "CLOUDINARY_API_BASE",
        default_value = "https://api.cloudinary.com"
    )]
    pub api_base: String,
    /// 单次搜索返回的最大资源数量
    #[arg(long, value_name = "N", default_value_t = 500)]
    pub max_results: usize,
}

/// 人脸比对配置
#[derive(Parser, Debug, Clone)]
pub struct MatchOptions {
    /// 判定为同一个人允许的最大特征距离
    #[arg(long, value_name = "DIST", env = "FACEGATE_TOLERANCE", default_value_t = 1.128)]
    pub tolerance: f32,
    /// ONNX 模型文件目录，缺失的模型会自动下载到这里
    #[arg(long, value_name = "DIR", env = "FACEGATE_MODEL_DIR", default_value = default_model_dir())]
    pub model_dir: PathBuf,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "facegate", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 启动 HTTP 人脸识别服务
    Server(ServerCommand),
    /// 识别本地图片中的人脸
    Recognize(RecognizeCommand),
    /// 拉取远端图库并列出其中的人脸
    Gallery(GalleryCommand),
}
