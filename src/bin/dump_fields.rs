//! CLI tool for dumping parsed fields and surcharge rows from one PDF

use remit_filler::{extract_surcharge_rows, extract_text_items_mem, extract_text_mem, parse_fields};
use std::env;
use std::fs;
use std::process;
use std::time::Instant;

fn json_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <pdf_file>", args[0]);
        eprintln!("       {} <pdf_file> --json", args[0]);
        process::exit(1);
    }

    let pdf_path = &args[1];
    let json_output = args.get(2).map(|a| a == "--json").unwrap_or(false);

    let data = match fs::read(pdf_path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Error reading {}: {}", pdf_path, e);
            process::exit(1);
        }
    };

    let start = Instant::now();

    let text = match extract_text_mem(&data) {
        Ok(text) => text,
        Err(e) => {
            if json_output {
                println!(r#"{{"error":"{}"}}"#, json_escape(&e.to_string()));
            } else {
                eprintln!("Error: {}", e);
            }
            process::exit(1);
        }
    };
    let fields = parse_fields(&text);

    let surcharges = match extract_text_items_mem(&data) {
        Ok(items) => extract_surcharge_rows(&items),
        Err(e) => {
            if json_output {
                println!(r#"{{"error":"{}"}}"#, json_escape(&e.to_string()));
            } else {
                eprintln!("Error: {}", e);
            }
            process::exit(1);
        }
    };

    let elapsed = start.elapsed();

    if json_output {
        let fields_json = fields
            .iter()
            .map(|(k, v)| format!(r#""{}":"{}""#, json_escape(k), json_escape(v)))
            .collect::<Vec<_>>()
            .join(",");
        let surcharges_json = surcharges
            .iter()
            .map(|r| {
                format!(
                    r#"{{"month":"{}","assessed":{:.2},"collected":{:.2}}}"#,
                    json_escape(&r.month),
                    r.assessed,
                    r.collected
                )
            })
            .collect::<Vec<_>>()
            .join(",");

        println!(
            r#"{{"file":"{}","fields":{{{}}},"payment_amount":{:.2},"surcharge_rows":[{}],"extraction_time_ms":{}}}"#,
            json_escape(pdf_path),
            fields_json,
            fields.payment_amount(),
            surcharges_json,
            elapsed.as_millis()
        );
    } else {
        println!("Confirmation Field Dump");
        println!("=======================");
        println!("File: {}", pdf_path);
        println!();

        if fields.is_empty() {
            println!("No labeled fields found.");
        } else {
            println!("Fields:");
            for (key, value) in fields.iter() {
                println!("  {}: {}", key, value);
            }
            println!();
            println!("Payment amount (numeric): {:.2}", fields.payment_amount());
        }
        println!();

        if surcharges.is_empty() {
            println!("No surcharge rows found.");
        } else {
            println!("Surcharge rows:");
            for row in &surcharges {
                println!(
                    "  {:<10} assessed {:>12.2}  collected {:>12.2}",
                    row.month, row.assessed, row.collected
                );
            }
        }
        println!();
        println!("Extraction time: {}ms", elapsed.as_millis());
    }
}
