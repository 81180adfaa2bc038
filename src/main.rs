fn main() -> std::process::ExitCode {
    layout_highlighter_lib::run()
}
