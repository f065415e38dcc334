mod gallery;
mod recognize;
pub mod server;

pub use gallery::*;
pub use recognize::*;
pub use server::*;

pub trait SubCommandExtend {
    fn run(&self) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}
