use clap::Parser;
use fortress_regression::cli::{self, Args};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let code = cli::execute(args).await;
    if code != 0 {
        std::process::exit(code);
    }
}
