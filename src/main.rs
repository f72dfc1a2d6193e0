use anyhow::Result;

fn main() -> Result<()> {
    devdiary_tui::cli::run()
}
