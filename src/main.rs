use lispy::ast::Lval;
use lispy::builtinops;
use lispy::evaluator::{self, Env};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::env;
use std::process;

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let root = evaluator::create_root_env();

    // With file arguments, run them as scripts and exit without a prompt
    if !args.is_empty() {
        let mut status = 0;
        for path in &args {
            let result = builtinops::load_file(&root, path, 0);
            if matches!(result, Lval::Err(_)) {
                eprintln!("{result}");
                status = 1;
            }
        }
        process::exit(status);
    }

    run_repl(&root);
}

fn run_repl(root: &Env) {
    println!("Lispy Version 0.1.0");
    println!("Press Ctrl+c to Exit\n");

    let mut rl = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(err) => {
            eprintln!("Could not initialize line editor: {err}");
            process::exit(1);
        }
    };

    loop {
        match rl.readline("lispy> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                let result = evaluator::read_eval(root, line);
                println!("{result}");
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {err:?}");
                break;
            }
        }
    }
}
