fn main() -> anyhow::Result<()> {
    focusline_lib::run()
}
