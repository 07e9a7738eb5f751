use catoc::driver;

fn main() -> anyhow::Result<()> {
    driver::run()?;

    Ok(())
}
