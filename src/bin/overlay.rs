//! Page viewer with the status overlay drawn on top of the page.

use anyhow::Result;
use toshokan::args::Args;

fn main() -> Result<()> {
    env_logger::init();

    let args = match Args::from_env() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{:#}", e);
            std::process::exit(1);
        }
    };
    log::info!("Loading {} page {} with overlay", args.input, args.page + 1);

    toshokan::viewer::run(args, true)
}
