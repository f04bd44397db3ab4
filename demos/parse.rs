//! Basic loading example

use cimplexml::Parser;
use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <xml-file>", args[0]);
        std::process::exit(1);
    }

    let parser = Parser::new();
    let doc = parser.parse_file(&args[1])?;

    let root = doc.root();
    println!("tag: {}, text: {}", root.tag(), root.text().unwrap_or(""));
    for attr in root.attributes() {
        println!("{}\n{}", attr.key, attr.value);
    }

    // Show the first 5 children
    for child in root.children().take(5) {
        println!("  - {}: {}", child.tag(), child.text().unwrap_or(""));
    }

    Ok(())
}
