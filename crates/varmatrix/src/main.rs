fn main() -> anyhow::Result<()> {
    varmatrix::run()
}
