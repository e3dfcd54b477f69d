//! CLI tool for batch-converting confirmation PDFs to remittance reports

use remit_filler::batch::{convert_batch, BatchInput, BatchOptions};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;

fn usage(program: &str) {
    eprintln!(
        "Usage: {} <output.zip> <file.pdf> [file.pdf ...] [options]",
        program
    );
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --initials <S>   Preparer initials");
    eprintln!("  --title <S>      Preparer title");
    eprintln!("  --name <S>       Preparer full name");
    eprintln!("  --date <S>       Certification date");
    eprintln!("  --template <P>   Template workbook path");
    eprintln!("  --logo <P>       Logo image path (missing logo is skipped)");
    eprintln!();
    eprintln!("Converts each PDF to a filled .xlsx and writes all of them");
    eprintln!("into one ZIP archive.");
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("pdf2remit");

    let mut options = BatchOptions::default();
    let mut positional: Vec<String> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        let arg = &args[i];
        let take_value = |i: &mut usize| -> String {
            *i += 1;
            match args.get(*i) {
                Some(v) => v.clone(),
                None => {
                    eprintln!("Missing value for {}", arg);
                    process::exit(1);
                }
            }
        };

        match arg.as_str() {
            "--initials" => options.certification.initials = take_value(&mut i),
            "--title" => options.certification.title = take_value(&mut i),
            "--name" => options.certification.full_name = take_value(&mut i),
            "--date" => options.certification.date = take_value(&mut i),
            "--template" => options.template_path = PathBuf::from(take_value(&mut i)),
            "--logo" => options.logo_path = PathBuf::from(take_value(&mut i)),
            "--help" | "-h" => {
                usage(program);
                process::exit(0);
            }
            _ => positional.push(arg.clone()),
        }
        i += 1;
    }

    if positional.len() < 2 {
        usage(program);
        process::exit(1);
    }

    let archive_path = PathBuf::from(&positional[0]);
    let mut inputs = Vec::new();
    for path in &positional[1..] {
        match BatchInput::from_path(path) {
            Ok(input) => inputs.push(input),
            Err(e) => {
                eprintln!("Error reading {}: {}", path, e);
                process::exit(1);
            }
        }
    }

    let outcome = match convert_batch(&inputs, &options) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = fs::write(&archive_path, &outcome.archive) {
        eprintln!("Error writing {}: {}", archive_path.display(), e);
        process::exit(1);
    }

    println!("Batch Conversion Results");
    println!("========================");
    for report in &outcome.reports {
        match &report.error {
            None => println!("ok    {} -> {}", report.input_name, report.entry_name),
            Some(err) => println!(
                "fail  {} -> {} (empty report): {}",
                report.input_name, report.entry_name, err
            ),
        }
    }
    println!();

    let failed = outcome.failed_count();
    println!("Files: {} converted, {} failed", outcome.reports.len() - failed, failed);
    println!(
        "Archive: {} ({} bytes, {} entries)",
        archive_path.display(),
        outcome.archive.len(),
        outcome.reports.len()
    );

    if failed > 0 {
        process::exit(2);
    }
}
