//! List command implementation

use crate::programmers::available_programmers;

/// List all programmers compiled into this build
pub fn list_programmers() {
    println!("Supported programmers:");
    println!();
    for p in available_programmers() {
        if p.aliases.is_empty() {
            println!("  {:8} - {}", p.name, p.description);
        } else {
            println!(
                "  {:8} - {} (aliases: {})",
                p.name,
                p.description,
                p.aliases.join(", ")
            );
        }
    }
}
