//! ipowner: CLI for building the caches and resolving IP addresses.

use clap::{Parser, Subcommand};
use ipowner::area::load_areas;
use ipowner::route::load_networks;
use ipowner::{Library, LibraryConfig};
use std::io::{self, BufRead};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ipowner")]
#[command(author = "Kaitu.io")]
#[command(version = "0.1.0")]
#[command(about = "Resolve IP addresses to location, area and AS ownership", long_about = None)]
struct Cli {
    /// YAML configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the area and network caches from their sources if absent
    Build,

    /// Resolve addresses (read from stdin when none are given)
    Lookup {
        /// IP addresses
        ips: Vec<String>,
    },

    /// Print the networks containing each address
    Networks {
        /// IP addresses
        ips: Vec<String>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = load_config(cli.config.as_ref()).and_then(|config| match cli.command {
        Commands::Build => build(&config),
        Commands::Lookup { ips } => lookup(&config, ips),
        Commands::Networks { ips } => networks(&config, ips),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<LibraryConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(LibraryConfig::from_file(path)?),
        None => Ok(LibraryConfig::default()),
    }
}

fn build(config: &LibraryConfig) -> Result<(), Box<dyn std::error::Error>> {
    let areas = load_areas(&config.area_dump, &config.area_cache())?;
    let networks = load_networks(&config.route_sources()?, &config.network_cache())?;

    println!("Areas: {} ({:?})", areas.len(), config.area_cache);
    println!(
        "Networks: {} IPv4, {} IPv6 ({:?})",
        networks.ipv4_len(),
        networks.ipv6_len(),
        config.network_cache
    );
    Ok(())
}

fn lookup(config: &LibraryConfig, ips: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let library = Library::open(config)?;

    for_each_address(ips, |ip| {
        let result = library.lookup(ip)?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        Ok(())
    })
}

fn networks(config: &LibraryConfig, ips: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let index = load_networks(&config.route_sources()?, &config.network_cache())?;

    for_each_address(ips, |ip| {
        let found = index.lookup(ip)?;
        if found.is_empty() {
            println!("{}: no network", ip);
        }
        for network in found {
            println!(
                "{}: AS{} {} {} {}",
                ip, network.asn, network.cidr, network.isp, network.as_name
            );
        }
        Ok(())
    })
}

/// Run `f` for each address, or for each stdin line when `ips` is empty.
///
/// Per-address failures are reported and do not stop the loop.
fn for_each_address<F>(ips: Vec<String>, mut f: F) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnMut(&str) -> Result<(), Box<dyn std::error::Error>>,
{
    let mut handle = |ip: &str| {
        let ip = ip.trim();
        if ip.is_empty() {
            return;
        }
        if let Err(e) = f(ip) {
            eprintln!("{}: {}", ip, e);
        }
    };

    if ips.is_empty() {
        for line in io::stdin().lock().lines() {
            handle(&line?);
        }
    } else {
        for ip in &ips {
            handle(ip);
        }
    }
    Ok(())
}
