fn main() -> anyhow::Result<()> {
    mnmd_sync::run()
}
