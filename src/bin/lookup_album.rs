//! Fetch one MusicBrainz release and print its track list.
//!
//! Usage:
//!     lookup_album [--verbose] <RELEASE_ID|URL>

use std::env;
use std::process;
use std::sync::Arc;

use autotag::musicbrainz::parse_release_id;
use autotag::{display, CatalogGateway, Config, MusicBrainzClient, RequestGate};

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    let inputs: Vec<&str> = args.iter().filter(|a| !a.starts_with('-')).map(|s| s.as_str()).collect();

    if inputs.is_empty() {
        eprintln!("Usage: lookup_album [--verbose] <RELEASE_ID|URL> ...");
        process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(if verbose { "autotag=debug" } else { "autotag=warn" })
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load().unwrap_or_else(|_| Config::new());
    let client = MusicBrainzClient::new(config.base_url(), config.user_agent(), config.search_limit());
    let gateway = CatalogGateway::new(client, Arc::new(RequestGate::new(config.request_interval())));

    let mut failed = false;
    for input in inputs {
        let Some(id) = parse_release_id(input) else {
            eprintln!("Not a MusicBrainz release id or URL: {}", input);
            failed = true;
            continue;
        };

        match gateway.fetch_album(&id) {
            Some(album) => {
                let stdout = std::io::stdout();
                if let Err(e) = display::write_album(&mut stdout.lock(), &album) {
                    eprintln!("Error writing album: {}", e);
                    failed = true;
                }
                println!();
            }
            None => {
                eprintln!("Release {} not found", id);
                failed = true;
            }
        }
    }

    if failed {
        process::exit(1);
    }
}
