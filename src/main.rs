use clap::Parser;
use facegate::cli::SubCommandExtend;
use facegate::config::SubCommand;
use facegate::Opts;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = Opts::parse();
    match &opts.subcmd {
        SubCommand::Server(cmd) => cmd.run().await,
        SubCommand::Recognize(cmd) => cmd.run().await,
        SubCommand::Gallery(cmd) => cmd.run().await,
    }
}
