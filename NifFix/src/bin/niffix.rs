fn main() -> anyhow::Result<()> {
    niffix::cli::run_cli()
}
