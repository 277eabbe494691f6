//! Syntax tree dumping tool for debugging the parser.

use std::env;
use std::fs;

use without::syntax::parse_source;
use without::syntax::printer::render_unit;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: dump_ast <file.vb>");
        std::process::exit(1);
    }

    let file_path = &args[1];
    let source = fs::read_to_string(file_path).unwrap_or_else(|e| {
        eprintln!("Failed to read {}: {}", file_path, e);
        std::process::exit(1);
    });

    let unit = parse_source(&source).unwrap_or_else(|e| {
        eprintln!("Failed to parse {}: {}", file_path, e);
        std::process::exit(1);
    });

    println!("AST for {}:", file_path);
    println!("================");
    println!("{unit:#?}");
    println!("================");
    print!("{}", render_unit(&unit));
}
