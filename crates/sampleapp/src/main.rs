fn main() {
    let code = match sampleapp::app() {
        Ok(mut app) => app.run(std::env::args_os()),
        Err(err) => {
            eprintln!("sampleapp: {}", err);
            1
        }
    };
    std::process::exit(code);
}
