use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use contact_lookup::AuthorizationStatus;

#[derive(Parser, Debug)]
#[clap(name = "contact-cli")]
#[clap(about = "Run contacts channel calls against a JSON address book", long_about = None)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(about = "Look up the user's contact")]
    Lookup {
        #[clap(flatten)]
        store: StoreArgs,

        #[clap(long, short, help = "Email address to match")]
        email: Option<String>,
    },
    #[command(about = "Send a raw method call to the channel")]
    Call {
        #[clap(flatten)]
        store: StoreArgs,

        method: String,

        #[clap(long, help = "JSON-encoded arguments")]
        args: Option<String>,
    },
}

#[derive(Args, Debug)]
pub struct StoreArgs {
    #[clap(long, short, help = "Address book fixture (JSON array)")]
    pub contacts: PathBuf,

    #[clap(long, value_enum, default_value_t = Status::Authorized)]
    pub status: Status,

    #[clap(long, action, help = "Answer the permission prompt with a refusal")]
    pub deny_prompt: bool,

    #[clap(long, help = "Lookup config (TOML)")]
    pub config: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    NotDetermined,
    Restricted,
    Denied,
    Authorized,
    Limited,
}

impl From<Status> for AuthorizationStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::NotDetermined => AuthorizationStatus::NotDetermined,
            Status::Restricted => AuthorizationStatus::Restricted,
            Status::Denied => AuthorizationStatus::Denied,
            Status::Authorized => AuthorizationStatus::Authorized,
            Status::Limited => AuthorizationStatus::Limited,
        }
    }
}
