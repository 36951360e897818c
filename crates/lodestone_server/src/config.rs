//! Command-line configuration (spec.md §6: "at most `--host`, `--port`,
//! `--save-dir`"), parsed with the teacher's hand-rolled `--flag value`
//! loop rather than an external CLI crate.

use lodestone_shared::constants;

/// Parsed startup configuration.
#[derive(Clone, Debug)]
pub struct ServerArgs {
    /// Bind address for the TCP listener.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Directory holding the embedded persistence database.
    pub save_dir: String,
}

impl Default for ServerArgs {
    fn default() -> Self {
        Self {
            host: constants::DEFAULT_BIND_ADDRESS.to_string(),
            port: constants::DEFAULT_PORT,
            save_dir: "./saves".to_string(),
        }
    }
}

impl ServerArgs {
    /// The embedded database file under `save_dir`.
    #[must_use]
    pub fn save_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.save_dir).join("world.db")
    }
}

/// Parses `args` (typically `std::env::args().skip(1)`). Returns `None` if
/// `--help`/`-h` was given, after printing usage.
#[must_use]
pub fn parse_args(args: &[String]) -> Option<ServerArgs> {
    let mut parsed = ServerArgs::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--host" => {
                if i + 1 < args.len() {
                    parsed.host = args[i + 1].clone();
                    i += 1;
                }
            }
            "--port" | "-p" => {
                if i + 1 < args.len() {
                    parsed.port = args[i + 1].parse().unwrap_or(parsed.port);
                    i += 1;
                }
            }
            "--save-dir" => {
                if i + 1 < args.len() {
                    parsed.save_dir = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Usage: lodestone_server [OPTIONS]");
                println!();
                println!("Options:");
                println!("      --host <ADDR>       Bind address (default: {})", constants::DEFAULT_BIND_ADDRESS);
                println!("  -p, --port <PORT>        TCP port (default: {})", constants::DEFAULT_PORT);
                println!("      --save-dir <DIR>     Directory for the embedded database (default: ./saves)");
                println!("  -h, --help               Show this help");
                return None;
            }
            _ => {}
        }
        i += 1;
    }

    Some(parsed)
}
