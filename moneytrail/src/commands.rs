use crate::CLAP_STYLING;
use clap::{arg, command};
use moneytrail::handlers::parse_target_url;

fn target_url_parser(value: &str) -> Result<String, String> {
    parse_target_url(value).ok_or_else(|| format!("'{}' is not a valid URL or host", value))
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("moneytrail")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("moneytrail")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner, progress and log output below warnings")
                .required(false)
                .global(true)
                .conflicts_with("verbose"),
        )
        .arg(
            arg!(-v --"verbose" "Enable debug logging")
                .required(false)
                .global(true),
        )
        .subcommand_required(true)
        .subcommand(
            command!("map")
                .about(
                    "Crawl a site under traversal policy, archiving every page reached and \
                writing mapping.json.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("Landing or portal URL to start from (https:// assumed when missing)")
                        .value_parser(target_url_parser),
                )
                .arg(
                    arg!(-e --"email" <EMAIL>)
                        .required(false)
                        .help("Account email handed to the login step")
                        .default_value(""),
                )
                .arg(
                    arg!(-s --"secret" <SECRET>)
                        .required(false)
                        .help("Password or token handed to the login step")
                        .default_value(""),
                )
                .arg(
                    arg!(--"max-pages" <NUM>)
                        .required(false)
                        .help("Maximum number of pages to record")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("100"),
                )
                .arg(
                    arg!(--"max-depth" <NUM>)
                        .required(false)
                        .help("Maximum link depth to traverse")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("3"),
                )
                .arg(
                    arg!(--"allow-external")
                        .required(false)
                        .help("Follow links to allowlisted external domains")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-x --"extract")
                        .required(false)
                        .help("Extract payout identifiers from each page as it is archived")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-p --"policy" <PATH>)
                        .required(false)
                        .help("JSON file overriding blocklists, allowlists, path hints and timeouts")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Directory holding run directories")
                        .default_value("./data"),
                )
                .arg(
                    arg!(--"run-id" <ID>)
                        .required(false)
                        .help("Run identifier (default: generated YYYYMMDD-HHMMSS-xxxx)"),
                ),
        )
        .subcommand(
            command!("scan")
                .about(
                    "Extract payout identifiers from a finished mapping run and write \
                extraction_results.json.",
                )
                .arg(
                    arg!(<DIR>)
                        .required(true)
                        .help("Run directory (<output>/<run_id>) or its map/ step directory")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                ),
        )
}
