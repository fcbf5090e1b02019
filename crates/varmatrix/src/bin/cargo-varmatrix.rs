//! Entry point for `cargo varmatrix ...`.

fn main() -> anyhow::Result<()> {
    varmatrix::run_from(varmatrix::cargo_args(std::env::args_os()))
}
