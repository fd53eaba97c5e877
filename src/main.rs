fn main() -> std::process::ExitCode {
    labdash_lib::run()
}
