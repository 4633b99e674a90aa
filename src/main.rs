fn main() -> Result<(), eframe::Error> {
    // RUST_LOG controls verbosity
    env_logger::init();

    diagram_canvas::run_app()
}
