use charter::actions::ActionKind;

/// Display version information
pub fn execute() {
    println!("charter {}", env!("CARGO_PKG_VERSION"));
    println!("Operator CLI for the charter governance constitution");
    println!("{} actions registered", ActionKind::ALL.len());
}
