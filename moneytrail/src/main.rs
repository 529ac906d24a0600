use commands::command_argument_builder;
use moneytrail::handlers::{handle_map, handle_scan, init_logging};
use moneytrail_core::archive_scan::ArchiveScanStatus;
use moneytrail_core::print_banner;
use moneytrail_scanner::result::MappingStatus;

mod commands;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");
    let verbose = chosen_command.get_flag("verbose");

    if !quiet {
        print_banner();
    }
    init_logging(verbose, quiet);

    let outcome = match chosen_command.subcommand() {
        Some(("map", primary_command)) => handle_map(primary_command, quiet)
            .await
            .and_then(|outcome| {
                let failed = outcome.mapping.status == MappingStatus::Error;
                Ok((serde_json::to_string_pretty(&outcome)?, failed))
            }),
        Some(("scan", primary_command)) => {
            handle_scan(primary_command, quiet).and_then(|result| {
                let failed = result.status == ArchiveScanStatus::Error;
                Ok((serde_json::to_string_pretty(&result)?, failed))
            })
        }
        _ => unreachable!("clap should ensure we don't get here"),
    };

    match outcome {
        Ok((json, failed)) => {
            println!("{}", json);
            if failed {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("✗ {:#}", e);
            std::process::exit(1);
        }
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
