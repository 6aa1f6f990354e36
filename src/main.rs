//! Domain Scout - multi-registrar domain availability and price research
//!
//! Checks every name under a set of TLDs, reusing cached answers and
//! spending at most the configured number of live registrar lookups.

use domain_scout::{
    domain::{self, DEFAULT_TLDS},
    logging,
    types::{AvailabilityStatus, DomainOutcome, Research},
    validation_error, DomainResearcher, Result, ScoutConfig,
};
use std::env;
use std::process;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct CliArgs {
    verbose: bool,
    json: bool,
    help: bool,
    version: bool,
    tlds: Vec<String>,
    names: Vec<String>,
}

impl CliArgs {
    fn parse<I: Iterator<Item = String>>(mut args: I) -> Result<Self> {
        let mut parsed = CliArgs::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => parsed.help = true,
                "-V" | "--version" => parsed.version = true,
                "-v" | "--verbose" => parsed.verbose = true,
                "--json" => parsed.json = true,
                "-t" | "--tld" => {
                    let value = args
                        .next()
                        .ok_or_else(|| validation_error!("{} needs a value", arg))?;
                    parsed.tlds.extend(expand_tlds(&value));
                }
                flag if flag.starts_with("--tld=") => {
                    parsed.tlds.extend(expand_tlds(&flag["--tld=".len()..]));
                }
                flag if flag.starts_with('-') && flag.len() > 1 => {
                    return Err(validation_error!("Unknown option: {}", flag));
                }
                _ => parsed.names.push(arg),
            }
        }
        Ok(parsed)
    }
}

/// A TLD argument may be a comma list or a named list such as `popular`.
fn expand_tlds(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .flat_map(|item| domain::get_tld_list(item).unwrap_or_else(|| vec![item.to_string()]))
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = domain_scout::init() {
        eprintln!("❌ Failed to initialize: {}", e);
        process::exit(1);
    }

    let args = match CliArgs::parse(env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("❌ {}", e);
            eprintln!("💡 Run `domain-scout --help` for usage");
            process::exit(2);
        }
    };

    if args.help {
        print_help();
        return Ok(());
    }
    if args.version {
        println!("domain-scout {}", domain_scout::VERSION);
        return Ok(());
    }
    if args.names.is_empty() {
        eprintln!("❌ No names given");
        eprintln!("💡 Run `domain-scout --help` for usage");
        process::exit(2);
    }

    logging::init_cli_logger(args.verbose);

    if let Err(e) = run(&args).await {
        eprintln!("{}", e.user_message());
        process::exit(1);
    }

    Ok(())
}

async fn run(args: &CliArgs) -> Result<()> {
    let tlds: Vec<String> = if args.tlds.is_empty() {
        DEFAULT_TLDS.iter().map(|s| s.to_string()).collect()
    } else {
        args.tlds.clone()
    };

    let candidates = domain::candidates(args.names.as_slice(), tlds.as_slice())?;
    if candidates.is_empty() {
        return Err(validation_error!("None of the given names can form a domain"));
    }

    let config = ScoutConfig::from_env()?;
    let researcher = DomainResearcher::from_config(&config).await?;

    if !args.json {
        let total: usize = candidates.values().map(Vec::len).sum();
        println!("🔎 Domain Scout - checking {} domains", total);
        println!("═══════════════════════════════════════════════════");
        println!();
    }

    let started = Instant::now();
    let research = researcher.check(&candidates).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&research)?);
    } else {
        display_research(&research, started.elapsed(), researcher.calls_made());
    }

    Ok(())
}

fn display_research(research: &Research, elapsed: Duration, calls_made: usize) {
    let mut available = 0;
    let mut taken = 0;
    let mut unknown = 0;

    for (name, outcomes) in research {
        println!("📛 {}", name);
        for (domain, outcome) in outcomes {
            match outcome.status() {
                AvailabilityStatus::Available => {
                    available += 1;
                    println!("   ✅ {} - AVAILABLE{}", domain, price_note(outcome));
                }
                AvailabilityStatus::Taken => {
                    taken += 1;
                    println!("   ❌ {} - TAKEN ({})", domain, outcome.provider);
                }
                AvailabilityStatus::Unknown => {
                    unknown += 1;
                    println!(
                        "   ⚠️  {} - UNKNOWN ({})",
                        domain,
                        outcome.error.as_deref().unwrap_or("no answer")
                    );
                }
            }
        }
        println!();
    }

    println!("📈 Summary:");
    println!("   ✅ Available: {}", available);
    println!("   ❌ Taken: {}", taken);
    if unknown > 0 {
        println!("   ⚠️  Unknown: {}", unknown);
    }
    println!("   🌐 Live lookups: {}", calls_made);
    println!("   ⏱️  Total time: {:.2}s", elapsed.as_secs_f32());
}

fn price_note(outcome: &DomainOutcome) -> String {
    let best = outcome
        .price_comparison
        .as_ref()
        .and_then(|c| c.best_price())
        .map(|b| b.registrar.as_str())
        .unwrap_or(outcome.provider.as_str());
    match outcome.price_usd {
        Some(price) => format!("  💰 ${:.2} at {}", price, best),
        None => format!("  (via {})", outcome.provider),
    }
}

fn print_help() {
    println!("🔎 Domain Scout - multi-registrar domain availability and pricing");
    println!("═══════════════════════════════════════════════════");
    println!();
    println!("USAGE:");
    println!("    domain-scout [OPTIONS] NAME...");
    println!();
    println!("OPTIONS:");
    println!("    -t, --tld TLD      TLD to check; repeatable, comma lists and");
    println!("                       named lists (default, popular, startup) accepted");
    println!("        --json         Print results as JSON");
    println!("    -v, --verbose      Debug logging on stderr");
    println!("    -V, --version      Print version");
    println!("    -h, --help         Print this help");
    println!();
    println!("EXAMPLES:");
    println!("    domain-scout acme                      # acme.com, acme.io, acme.ai");
    println!("    domain-scout --tld dev \"rocket ship\"   # rocket-ship.dev");
    println!("    domain-scout --json --tld popular acme");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("    DOMAIN_CACHE_PATH        Cache file (default: domain_cache.sqlite3)");
    println!("    DOMAIN_CHECK_MAX_CALLS   Live lookups per run (default: 80)");
    println!("    ENABLE_MULTI_REGISTRAR   Compare registrar prices (default: 1)");
    println!();
    println!("    NAME_COM_USERNAME, NAME_COM_API_KEY      Name.com");
    println!("    GODADDY_API_KEY, GODADDY_API_SECRET      GoDaddy");
    println!("    CLOUDFLARE_API_TOKEN                     Cloudflare");
    println!("    NAMECHEAP_API_USER, NAMECHEAP_API_KEY    Namecheap");
    println!("    DOMAINR_API_KEY                          Domainr");
    println!("    MCP_FASTDOMAINCHECK_ENABLED, MCP_FASTDOMAINCHECK_API_KEY  Batch service");
    println!();
    println!("    ENABLE_<PROVIDER>, <PROVIDER>_RPS, <PROVIDER>_BURST and");
    println!("    <PROVIDER>_TIMEOUT_SECS tune each registrar.");
}
