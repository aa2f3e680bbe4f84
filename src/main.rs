fn main() {
    bindgraph::cli::run();
}
