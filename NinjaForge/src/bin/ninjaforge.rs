fn main() -> anyhow::Result<()> {
    ninjaforge::cli::run_cli()
}
