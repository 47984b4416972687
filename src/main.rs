use anyhow::Result;

fn main() -> Result<()> {
    versegrep::app::run()
}
