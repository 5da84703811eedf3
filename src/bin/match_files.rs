//! Match a set of audio files against MusicBrainz.
//!
//! Reads a JSON manifest (an array of `{"path", "duration_ms", "tags"}`
//! objects produced by a tag reader), groups the files, matches every group
//! in parallel and prints which album and track each file belongs to.
//!
//! Usage:
//!     match_files [options] manifest.json

use std::env;
use std::fs;
use std::process;
use std::sync::Arc;

use autotag::{
    display, CatalogGateway, Config, FileEntry, FileRecord, Group, MatchCoordinator, MusicBrainzClient,
    RequestGate,
};

fn print_help() {
    println!("Usage: match_files [OPTIONS] <MANIFEST>");
    println!();
    println!("Options:");
    println!("  --album <ID|URL>          Compare all files against this release only (repeatable)");
    println!("  --workers <N>             Groups matched in parallel (default: 4)");
    println!("  --interval-ms <MS>        Minimum time between catalog requests, at least 1000 (default: 1000)");
    println!("  --low-floor <SCORE>       Drop file/track scores below this (default: 0.2)");
    println!("  --high-floor <SCORE>      Stop searching for files scoring above this (default: 0.75)");
    println!("  --exclusive               Never assign one file to two tracks");
    println!("  --show-saved-defaults     Show saved default configuration and exit");
    println!("  --save-defaults           Save current command-line options as defaults");
    println!("  -v, --verbose             Debug logging (RUST_LOG overrides)");
    println!("  --help                    Show this help message");
    println!();
    println!("  Defaults can be saved to ~/.state/autotag/defaults.toml using --save-defaults.");
}

fn init_logging(verbose: bool) {
    let default = if verbose { "autotag=debug" } else { "autotag=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn parse_value<T: std::str::FromStr>(args: &[String], i: usize, flag: &str) -> T {
    match args.get(i + 1).map(|v| v.parse()) {
        Some(Ok(v)) => v,
        _ => {
            eprintln!("Error: {} needs a valid value", flag);
            process::exit(1);
        }
    }
}

fn load_manifest(path: &str) -> Result<Vec<FileRecord>, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    let entries: Vec<FileEntry> = serde_json::from_str(&content)?;
    Ok(entries.into_iter().map(FileRecord::from).collect())
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let saved_config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: ignoring saved defaults: {}", e);
            Config::new()
        }
    };

    let mut cmdline_config = Config::new();
    let mut save_defaults = false;
    let mut verbose = false;
    let mut album_ids: Vec<String> = Vec::new();
    let mut positional_args = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--show-saved-defaults" => {
                match Config::get_config_path() {
                    Ok(path) if path.exists() => {
                        println!("Saved defaults from {:?}:", path);
                        println!();
                        saved_config.print("Configuration");
                    }
                    Ok(path) => {
                        println!("No saved defaults file found at {:?}", path);
                        println!("Use --save-defaults to create one.");
                    }
                    Err(e) => println!("Could not determine config file path: {}", e),
                }
                process::exit(0);
            }
            "--save-defaults" => save_defaults = true,
            "--verbose" | "-v" => verbose = true,
            "--exclusive" => cmdline_config.exclusive_assignment = Some(true),
            "--album" => {
                let value: String = parse_value(&args, i, "--album");
                match autotag::musicbrainz::parse_release_id(&value) {
                    Some(id) => album_ids.push(id),
                    None => {
                        eprintln!("Error: not a MusicBrainz release id or URL: {}", value);
                        process::exit(1);
                    }
                }
                i += 1;
            }
            "--workers" => {
                cmdline_config.workers = Some(parse_value(&args, i, "--workers"));
                i += 1;
            }
            "--interval-ms" => {
                cmdline_config.request_interval_ms = Some(parse_value(&args, i, "--interval-ms"));
                i += 1;
            }
            "--low-floor" => {
                cmdline_config.low_relevance_floor = Some(parse_value(&args, i, "--low-floor"));
                i += 1;
            }
            "--high-floor" => {
                cmdline_config.high_confidence_floor = Some(parse_value(&args, i, "--high-floor"));
                i += 1;
            }
            arg if arg.starts_with('-') => {
                eprintln!("Unknown option: {}", arg);
                print_help();
                process::exit(1);
            }
            arg => positional_args.push(arg.to_string()),
        }
        i += 1;
    }

    if save_defaults {
        let mut to_save = saved_config.clone();
        to_save.merge(&cmdline_config);
        match to_save.save() {
            Ok(()) => println!("Defaults saved."),
            Err(e) => eprintln!("Warning: could not save defaults: {}", e),
        }
    }

    let Some(manifest) = positional_args.first() else {
        if save_defaults {
            process::exit(0);
        }
        print_help();
        process::exit(1);
    };

    init_logging(verbose);

    let mut config = saved_config;
    config.merge(&cmdline_config);

    let files = match load_manifest(manifest) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("Error: could not read manifest {}: {}", manifest, e);
            process::exit(1);
        }
    };
    println!("Loaded {} files from {}", files.len(), manifest);

    let client = MusicBrainzClient::new(config.base_url(), config.user_agent(), config.search_limit());
    let gate = Arc::new(RequestGate::new(config.request_interval()));
    let gateway = Arc::new(CatalogGateway::new(client, gate));

    let mut coordinator = match MatchCoordinator::new(gateway, config.match_settings(), config.workers()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if album_ids.is_empty() {
        for file in files {
            coordinator.file_loaded(file);
        }
        coordinator.all_files_loaded();
    } else {
        let mut group = Group::new("command line");
        for file in files {
            group.add_file(file);
        }
        coordinator.match_group_with_albums(group, album_ids);
    }

    let results = coordinator.wait_for_all(|matched| {
        if let Err(e) = display::print_match_report(matched) {
            eprintln!("Error writing report: {}", e);
        }
    });

    let matched = results.iter().filter(|r| r.album.is_some()).count();
    println!("Matched {} of {} groups", matched, results.len());
}
