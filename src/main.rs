fn main() -> anyhow::Result<()> {
    telecam::flow::run()
}
