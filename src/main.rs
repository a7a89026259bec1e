fn main() {
    if let Err(err) = runwalk_lib::run() {
        eprintln!("runwalk: {err:#}");
        std::process::exit(1);
    }
}
