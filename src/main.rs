//! Design Token Converter Binary

use std::process;
use tokenc::TokenCli;

fn main() {
    let mut cli = TokenCli::new();

    match cli.run() {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("❌ {}", e);
            process::exit(1);
        }
    }
}
