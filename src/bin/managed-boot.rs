fn main() {
    std::process::exit(managed_boot::cli::run())
}
