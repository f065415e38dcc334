use std::fs;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::info;
use serde_json::json;
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::codec;
use crate::config::{MatchOptions, MediaStoreOptions};
use crate::fetcher::MediaStore;
use crate::vision::{FaceEncoder, ensure_models};

#[derive(Parser, Debug, Clone)]
pub struct RecognizeCommand {
    #[command(flatten)]
    pub store: MediaStoreOptions,
    #[command(flatten)]
    pub matching: MatchOptions,
    /// 待识别的图片路径
    pub image: String,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for RecognizeCommand {
    async fn run(&self) -> Result<()> {
        ensure_models(&self.matching).await?;
        let encoder = FaceEncoder::new(&self.matching)?;

        let bytes = fs::read(&self.image)?;
        let embeddings = block_in_place(|| -> Result<_> {
            let img = codec::decode_image_bytes(&bytes)?;
            encoder.detect_and_embed(&img)
        })?;
        let Some(query) = embeddings.into_iter().next() else {
            anyhow::bail!("图片中未检测到人脸");
        };

        let store = MediaStore::new(self.store.clone());
        let gallery = store.load_gallery(&encoder).await;
        info!("图库加载完成，共 {} 张人脸", gallery.len());

        let name = gallery.recognize(&query, self.matching.tolerance);
        match self.output_format {
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "matched": name.is_some(),
                        "name": name,
                    }))?
                )
            }
            OutputFormat::Table => match name {
                Some(name) => println!("{name}"),
                None => println!("未识别"),
            },
        }
        Ok(())
    }
}

#[derive(ValueEnum, Debug, Clone)]
pub enum OutputFormat {
    Json,
    Table,
}
