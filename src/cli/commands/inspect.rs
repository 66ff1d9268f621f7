use clap::Subcommand;
use serde_json::json;

use crate::cli::{utils::output_fields, OutputFormat};
use crate::config;
use crate::rules::RuleBook;

#[derive(Subcommand)]
pub enum InspectCommands {
    #[command(about = "Show the effective configuration (secrets redacted)")]
    Config,

    #[command(about = "List the business rule sets in evaluation order")]
    Rules,
}

pub fn handle(cmd: InspectCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        InspectCommands::Config => {
            let mut config = config::config().clone();
            if !config.security.jwt_secret.is_empty() {
                config.security.jwt_secret = "********".to_string();
            }
            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&json!({ "config": config }))?),
                OutputFormat::Text => print!("{}", serde_yaml::to_string(&config)?),
            }
            Ok(())
        }
        InspectCommands::Rules => {
            let book = RuleBook::standard();
            output_fields(
                output_format,
                "rule sets",
                &[
                    ("activity_registration", book.registration.names().join(" -> ")),
                    ("schedule_entry", book.schedule.names().join(" -> ")),
                    ("student_transfer", book.transfer.names().join(" -> ")),
                    ("application_status", book.application.names().join(" -> ")),
                ],
            )
        }
    }
}
