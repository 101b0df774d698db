use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Secrets are deliberately left off this list
    const DISPLAY_ENVS: [&str; 18] = [
        "RUST_LOG",
        "FDG_HOST",
        "FDG_PORT",
        "FDG_DATABASE_URL",
        "FDG_BRANCHES",
        "FDG_PAUSED_BRANCHES",
        "FDG_SERVICE_CHARGE",
        "FDG_PLACEHOLDER_FEE",
        "FDG_FALLBACK_FEE",
        "FDG_BASE_FEE",
        "FDG_BASE_DISTANCE_KM",
        "FDG_FEE_PER_KM",
        "FDG_SERVICE_RADIUS_KM",
        "FDG_HARD_CAP_KM",
        "FDG_DISTANCE_TIMEOUT_MS",
        "FDG_PREP_TIME_MINUTES",
        "FDG_MAPS_BASE_URL",
        "FDG_PAYMENT_HMAC_CHECKS",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
