use ofx_statement_rs::{OfxVersion, ParserBuilder, SerializerBuilder};
use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let Some(file_path) = args.get(1) else {
        println!("Usage: cargo run --example convert <statement.ofx> [--xml]");
        return Ok(());
    };

    let bytes = std::fs::read(file_path)?;
    let parsed = ParserBuilder::new().bytes(&bytes).parse()?;

    eprintln!(
        "Read {} statement(s), version {}, encoding {}",
        parsed.statements.len(),
        parsed.header.version.as_deref().unwrap_or("unknown"),
        parsed.header.encoding.name()
    );
    for warning in &parsed.warnings {
        eprintln!("  warning: {warning}");
    }

    for statement in &parsed.statements {
        eprintln!(
            "  {} {:?}: {} transactions, {} duplicate FITIDs",
            statement.account.account_id,
            statement.account.account_type,
            statement.transactions.len(),
            statement.duplicate_fitids().len()
        );
    }

    let version = if args.iter().any(|a| a == "--xml") {
        OfxVersion::V220
    } else {
        OfxVersion::V102
    };
    print!("{}", SerializerBuilder::new().version(version).serialize(&parsed.statements));

    Ok(())
}
