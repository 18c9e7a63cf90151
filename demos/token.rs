//! Generate, verify and refresh JWTs from the command line.
//!
//! Loads `.env` automatically if present, otherwise reads from the environment.
//!
//! ```bash
//! cargo run --example token -- generate 42
//! cargo run --example token -- verify eyJhbG...
//! cargo run --example token -- refresh eyJhbG...
//! cargo run --example token -- secret
//! ```

use jwt_auth_bridge::{generate_secret, JwtConfig, Manager, Token};

fn main() {
    // Load .env if present; silently ignore if absent.
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        usage();
    }

    // Needs no config, so it works before JWT_SECRET exists.
    if args[0] == "secret" {
        println!("JWT_SECRET={}", generate_secret());
        return;
    }

    let config = JwtConfig::from_env().expect("JWT_SECRET must be set");
    let manager = Manager::new(&config).unwrap_or_else(|e| fail(e));

    match args[0].as_str() {
        "generate" => {
            let subject = args.get(1).unwrap_or_else(|| usage());
            let payload = manager
                .factory()
                .sub(subject.as_str())
                .make()
                .unwrap_or_else(|e| fail(e));
            match manager.encode(&payload) {
                Ok(token) => println!("{token}"),
                Err(e) => fail(e),
            }
        }
        "verify" => {
            let token = parse(args.get(1));
            match manager.decode(&token) {
                Ok(payload) => {
                    println!("Valid\n");
                    for claim in payload.claims() {
                        println!("  {:<4}: {}", claim.name(), claim.value());
                    }
                }
                Err(e) => fail(e),
            }
        }
        "refresh" => {
            let token = parse(args.get(1));
            match manager.refresh(&token) {
                Ok(token) => println!("{token}"),
                Err(e) => fail(e),
            }
        }
        _ => usage(),
    }
}

fn parse(raw: Option<&String>) -> Token {
    let raw = raw.unwrap_or_else(|| usage());
    Token::new(raw.as_str()).unwrap_or_else(|e| fail(e))
}

fn fail(e: impl std::fmt::Display) -> ! {
    eprintln!("Failed: {e}");
    std::process::exit(1);
}

fn usage() -> ! {
    eprintln!("Usage:");
    eprintln!("  cargo run --example token -- generate <subject>");
    eprintln!("  cargo run --example token -- verify   <token>");
    eprintln!("  cargo run --example token -- refresh  <token>");
    eprintln!("  cargo run --example token -- secret");
    std::process::exit(1);
}
