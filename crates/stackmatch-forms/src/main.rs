fn main() {
    if let Err(err) = stackmatch_forms::cli::main() {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}
