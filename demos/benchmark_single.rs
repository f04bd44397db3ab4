use cimplexml::Parser;
use std::env;
use std::time::Instant;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <xml_file>", args[0]);
        std::process::exit(1);
    }

    let filepath = &args[1];
    let parser = Parser::new();

    let start = Instant::now();
    match parser.parse_file(filepath) {
        Ok(doc) => {
            let elapsed = start.elapsed();
            let ms = elapsed.as_secs_f64() * 1000.0;

            println!(
                "cimplexml loaded: {} elements, depth {} (in {:.3}ms)",
                doc.node_count(),
                doc.max_depth(),
                ms
            );

            let attributes: usize = doc.descendants().map(|n| n.attributes().len()).sum();
            let with_text = doc.descendants().filter(|n| n.text().is_some()).count();
            println!("Attributes: {}", attributes);
            println!("Elements with text: {}", with_text);
            println!("Time: {:.3}ms", ms);
        }
        Err(e) => {
            eprintln!("Error loading file: {}", e);
            std::process::exit(1);
        }
    }
}
