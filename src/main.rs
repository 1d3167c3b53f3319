use anyhow::Result;

fn main() -> Result<()> {
    env_logger::init();
    logsift::cli::run()
}
