pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("Error: {err}");
    std::process::exit(1);
}
