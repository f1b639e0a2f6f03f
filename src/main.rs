use clap::Parser;
use hive_catalog::{CatalogController, CatalogState, LoadOutcome};
use hive_client::{ApiError, HttpEventApi, HttpEventSource, RegistrationRequest, SignupRequest};
use hive_core::{DraftError, EventDraft, EventRecord, FilterCriteria};
use log::{LevelFilter, debug, error, info, warn};
use thiserror::Error;

mod cli;
mod config;
mod logs;

use cli::{Cli, Command, ListArgs};
use config::{Config, ConfigError};

#[derive(Debug, Error)]
enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Draft(#[from] DraftError),

    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("{0}")]
    Catalog(String),
}

fn format_record(record: &EventRecord) -> String {
    let when = record.date.clone().unwrap_or_else(|| {
        format!("{} {}", record.start_date, record.start_time)
            .trim()
            .to_string()
    });
    let mut line = format!(
        "[{}] {} | {} | {} | {} | {}",
        record.event_type,
        record.id,
        record.title,
        when,
        record.location,
        record.price_label()
    );
    if let Some(registration) = &record.registration {
        line.push_str(&format!(" | payment {}", registration.payment_status));
    }
    line
}

async fn list(api: HttpEventApi, config: &Config, args: ListArgs) -> Result<(), AppError> {
    let limit = args.limit.unwrap_or(config.page_limit);
    let catalog = CatalogController::new(HttpEventSource::new(api, args.feed).into_arc(), limit);
    let criteria = FilterCriteria::from(args.filter);
    if !criteria.is_empty() {
        debug!("Filtering with {:?}", criteria);
        catalog.set_filter(criteria);
    }

    info!("Loading {} feed", args.feed);
    if catalog.initialize().await == LoadOutcome::Failed {
        let state = catalog.state();
        return Err(AppError::Catalog(state.error.unwrap_or_default()));
    }

    let mut pages = 1;
    while pages < args.pages && catalog.state().has_more {
        match catalog.load_more().await {
            LoadOutcome::Loaded(_) => pages += 1,
            LoadOutcome::Failed => {
                warn!("Stopping after {} pages", pages);
                break;
            }
            LoadOutcome::Skipped | LoadOutcome::Stale => break,
        }
    }

    let state: CatalogState = catalog.state();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }
    for record in &state.records {
        println!("{}", format_record(record));
    }
    println!(
        "{} of {} loaded events shown{}",
        state.records.len(),
        catalog.total_loaded(),
        if state.has_more { ", more available" } else { "" }
    );
    if let Some(error) = state.error {
        println!("last page failed: {}", error);
    }
    Ok(())
}

async fn run(cli: Cli, config: Config) -> Result<(), AppError> {
    let api = HttpEventApi::new(config.session())?;
    match cli.command {
        Command::List(args) => list(api, &config, args).await?,
        Command::Participants { event_id } => {
            let participants = api.fetch_participants(&event_id).await?;
            for p in &participants {
                println!(
                    "{} | {} | {} | {} | {} ({})",
                    p.registration_date,
                    p.user_name,
                    p.user_email,
                    p.phone_number,
                    p.payment_status,
                    p.payment_method
                );
            }
            println!("{} participants", participants.len());
        }
        Command::Register {
            event_id,
            phone,
            payment_method,
        } => {
            let request = match payment_method {
                Some(method) => RegistrationRequest::pending(phone, method),
                None => RegistrationRequest::free(phone),
            };
            let receipt = api.register(&event_id, &request).await?;
            println!("{} ({})", receipt.message, receipt.registration_id);
            if receipt.payment_required {
                println!("Complete payment to confirm your registration");
            }
        }
        Command::Login {
            role,
            email,
            password,
        } => {
            let token = api.login(role, email, password).await?;
            println!("{}", token);
        }
        Command::Signup {
            role,
            name,
            email,
            password,
            confirm_password,
        } => {
            let request = SignupRequest::new(name, email, password, confirm_password);
            let token = api.signup(role, &request).await?;
            println!("{}", token);
        }
        Command::Create(args) => {
            let draft = EventDraft::from(args).validate_draft()?;
            info!("Creating event {:?}", draft.draft().title);
            let record = api.create_event(&draft).await?;
            println!("{}", format_record(&record));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to load .env file: {}", e);
        }
    }

    let cli = Cli::parse();
    logs::init_logger(if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    });

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = run(cli, config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use hive_core::normalize;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_format_record() {
        let record = normalize(&json!({
            "id": "e1", "type": "PAID", "cost": 359, "title": "Bootcamp",
            "date": "Saturday, March 19, 09:30PM", "location": "Online",
            "payment_status": "pending"
        }));
        assert_eq!(
            format_record(&record),
            "[PAID] e1 | Bootcamp | Saturday, March 19, 09:30PM | Online | 359 INR | payment pending"
        );

        let record = normalize(&json!({ "id": "e2", "type": "free", "start_date": "2025-03-19" }));
        assert_eq!(
            format_record(&record),
            "[FREE] e2 | Untitled Event | 2025-03-19 |  | FREE"
        );
    }
}
