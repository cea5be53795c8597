use privalog::{CommandKind, Database};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

fn main() -> rustyline::Result<()> {
    let mut rl = DefaultEditor::new()?;
    let mut db = Database::new();
    loop {
        match rl.readline("?- ") {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                if line.starts_with(':') {
                    let end_of_command = line.find(' ').unwrap_or(line.len());
                    match &line[0..end_of_command] {
                        ":reset" => {
                            db = Database::new();
                        }
                        ":load" => {
                            if end_of_command == line.len() {
                                println!("Usage:\n\t:load <filename>");
                                continue;
                            }
                            let filename = &line[end_of_command + 1..];
                            match std::fs::read_to_string(filename) {
                                Ok(contents) => {
                                    run(&db, &contents);
                                    println!("Loaded!");
                                }
                                Err(err) => {
                                    println!("Failed to load: {}", err);
                                }
                            }
                        }
                        ":help" => {
                            println!(
                                "Available commands:
            \t:help
            \t:reset
            \t:load <filename>

Terminate a clause with '.' to assert it and a query with '?' to run it."
                            )
                        }
                        _ => {
                            println!("Unknown command: {}", line);
                        }
                    }
                } else {
                    run(&db, &line);
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }
    Ok(())
}

/// Parse and apply a chunk of input, printing query results as they come.
fn run(db: &Database, input: &str) {
    let commands = match db.parse(input) {
        Ok(commands) => commands,
        Err(err) => {
            println!("Parse error: {}", err);
            return;
        }
    };
    for command in commands {
        let is_query = command.kind == CommandKind::Query;
        match db.apply(command) {
            Ok(results) => {
                if is_query {
                    if results.is_empty() {
                        println!("No solutions.");
                    } else {
                        print!("{}", db.format_results(&results));
                    }
                }
            }
            Err(err) => {
                println!("Error: {}", err);
            }
        }
    }
}
