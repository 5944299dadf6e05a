fn main() {
  std::process::exit(flexdriver_lib::run());
}
