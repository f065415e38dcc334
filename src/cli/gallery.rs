use anyhow::Result;
use clap::Parser;

use crate::cli::SubCommandExtend;
use crate::config::{MatchOptions, MediaStoreOptions};
use crate::fetcher::MediaStore;
use crate::vision::{FaceEncoder, ensure_models};

#[derive(Parser, Debug, Clone)]
pub struct GalleryCommand {
    #[command(flatten)]
    pub store: MediaStoreOptions,
    #[command(flatten)]
    pub matching: MatchOptions,
}

impl SubCommandExtend for GalleryCommand {
    async fn run(&self) -> Result<()> {
        ensure_models(&self.matching).await?;
        let encoder = FaceEncoder::new(&self.matching)?;

        let store = MediaStore::new(self.store.clone());
        let gallery = store.load_gallery(&encoder).await;
        for entry in gallery.entries() {
            println!("{}", entry.name);
        }
        println!("共 {} 张人脸", gallery.len());
        Ok(())
    }
}
