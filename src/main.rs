use tracing::error;
use tracing_subscriber::EnvFilter;
use travel_claims::cli;
use travel_claims::errors::Error;

fn main() {
    // Initialize tracing as early as possible
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = cli::run() {
        // Callers care most about the one self-inflicted failure mode:
        // an output file still open in a spreadsheet program.
        match &e {
            Error::ResourceBusy(_) => {
                error!("{e}. 请先关闭对应的 Excel 文件, 然后重新生成。");
            }
            _ => error!("{e}"),
        }
        std::process::exit(1);
    }
}
