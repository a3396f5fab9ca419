fn main() {
    tidl::cli::run();
}
