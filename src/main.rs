fn main() -> anyhow::Result<()> {
    chat_export_analyzer::cli::run()
}
