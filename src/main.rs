fn main() {
    if let Err(e) = league_logos::run() {
        tracing::error!(kind = e.kind(), "Fatal: {e}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
