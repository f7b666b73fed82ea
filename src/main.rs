fn main() {
    std::process::exit(palisade::run());
}
