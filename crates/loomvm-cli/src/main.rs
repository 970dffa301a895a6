use std::{env, fs, process::ExitCode, time::Instant};

use loomvm::Interpreter;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let file_path = if args.len() > 1 { &args[1] } else { "example.loom" };
    let source = match read_file(file_path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut interp = Interpreter::new();
    let start = Instant::now();
    match interp.run_source(&source) {
        Ok(value) => {
            let elapsed = start.elapsed();
            println!("{value:?}");
            eprintln!("success after: {elapsed:?}");
            ExitCode::SUCCESS
        }
        Err(signal) => {
            let elapsed = start.elapsed();
            eprintln!("error after: {elapsed:?}\n{signal}");
            ExitCode::FAILURE
        }
    }
}

fn read_file(file_path: &str) -> Result<String, String> {
    eprintln!("Reading file: {file_path}");
    match fs::metadata(file_path) {
        Ok(metadata) => {
            if !metadata.is_file() {
                return Err(format!("Error: {file_path} is not a file"));
            }
        }
        Err(err) => {
            return Err(format!("Error reading {file_path}: {err}"));
        }
    }
    match fs::read_to_string(file_path) {
        Ok(contents) => Ok(contents),
        Err(err) => Err(format!("Error reading file: {err}")),
    }
}
