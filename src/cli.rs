use clap::{Args, Parser, Subcommand};
use hive_client::{EventFeed, Role};
use hive_core::{EventDraft, EventType, FilterCriteria};

#[derive(Debug, Parser)]
#[command(name = "event-hive", version, about = "Browse and manage Event Hive events")]
pub struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List events, optionally filtered
    List(ListArgs),
    /// Show who registered for an event (admin)
    Participants { event_id: String },
    /// Register for an event (user)
    Register {
        event_id: String,
        #[arg(long)]
        phone: String,
        /// Payment method for paid events; omit for free ones
        #[arg(long)]
        payment_method: Option<String>,
    },
    /// Log in and print the bearer token
    Login {
        #[arg(long, value_parser = parse_role, default_value = "user")]
        role: Role,
        #[arg(long)]
        email: String,
        #[arg(long, env = "HIVE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and print the bearer token
    Signup {
        #[arg(long, value_parser = parse_role, default_value = "user")]
        role: Role,
        /// Required for users; admins default to the email's local part
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "HIVE_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, env = "HIVE_PASSWORD_CONFIRM", hide_env_values = true)]
        confirm_password: String,
    },
    /// Create an event (admin)
    Create(CreateArgs),
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub venue: String,
    /// YYYY-MM-DD
    #[arg(long)]
    pub start_date: String,
    /// HH:MM, 24-hour
    #[arg(long)]
    pub start_time: String,
    #[arg(long)]
    pub end_date: String,
    #[arg(long)]
    pub end_time: String,
    /// FREE or PAID, defaults to FREE
    #[arg(long = "type", value_parser = parse_event_type)]
    pub event_type: Option<EventType>,
    /// Required for PAID events
    #[arg(long)]
    pub cost: Option<f64>,
    #[arg(long)]
    pub description: String,
    /// A data:image/...;base64 URL
    #[arg(long)]
    pub image: String,
}

impl From<CreateArgs> for EventDraft {
    fn from(args: CreateArgs) -> Self {
        EventDraft {
            title: args.title,
            venue: args.venue,
            start_date: args.start_date,
            start_time: args.start_time,
            end_date: args.end_date,
            end_time: args.end_time,
            cost: args.cost,
            description: args.description,
            image: args.image,
            event_type: args.event_type,
        }
    }
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// all, admin or registered
    #[arg(long, default_value = "all")]
    pub feed: EventFeed,

    /// Number of pages to load
    #[arg(long, default_value_t = 1)]
    pub pages: u32,

    /// Page size, overrides HIVE_PAGE_LIMIT
    #[arg(long)]
    pub limit: Option<u32>,

    /// Print the catalog state as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub filter: FilterArgs,
}

#[derive(Debug, Default, Args)]
pub struct FilterArgs {
    /// FREE or PAID
    #[arg(long = "type")]
    pub event_type: Option<String>,
    /// Substring of the location
    #[arg(long)]
    pub location: Option<String>,
    /// Exact date, YYYY-MM-DD
    #[arg(long)]
    pub date: Option<String>,
    /// Weekday code such as mon or tue
    #[arg(long)]
    pub weekday: Option<String>,
    /// online or in-person
    #[arg(long)]
    pub kind: Option<String>,
    /// Substring of category, title or description
    #[arg(long)]
    pub category: Option<String>,
}

impl From<FilterArgs> for FilterCriteria {
    fn from(args: FilterArgs) -> Self {
        FilterCriteria {
            event_type: args.event_type,
            location: args.location,
            date: args.date,
            weekday: args.weekday,
            kind: args.kind,
            category: args.category,
        }
    }
}

fn parse_role(s: &str) -> Result<Role, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "user" => Ok(Role::User),
        "admin" => Ok(Role::Admin),
        other => Err(format!("unknown role: {}", other)),
    }
}

fn parse_event_type(s: &str) -> Result<EventType, String> {
    match s.trim().to_ascii_uppercase().as_str() {
        "FREE" => Ok(EventType::Free),
        "PAID" => Ok(EventType::Paid),
        other => Err(format!("unknown event type: {}", other)),
    }
}
