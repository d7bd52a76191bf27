//! Registry CLI - command-line access to the parcel store
//!
//! Every command opens the store, performs one operation and prints the
//! affected records as JSON.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use land_registry::{
    CouncilRoster, CouncilSession, EventBus, KeyValueStore, NewParcel, ParcelStatus, ParcelStore,
    ParcelUpdate, SearchCriteria, DEFAULT_DISTRICTS,
};

/// Registry commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Submit a new land claim
    Submit(SubmitArgs),

    /// Show one parcel
    Show {
        /// Parcel id
        id: u64,
    },

    /// Search parcels
    Search(SearchArgs),

    /// Edit owner fields of a parcel
    Update {
        /// Parcel id
        id: u64,
        #[command(flatten)]
        fields: UpdateArgs,
    },

    /// Delete a parcel
    Delete {
        /// Parcel id
        id: u64,
    },

    /// Withdraw your own pending claim
    Withdraw {
        /// Parcel id
        id: u64,
        /// Owner wallet address
        #[arg(long)]
        wallet: String,
    },

    /// Approve a parcel as a council member
    Approve {
        /// Parcel id
        id: u64,
        /// Council member name or wallet (defaults to the logged-in member)
        #[arg(short, long)]
        member: Option<String>,
    },

    /// Reject a parcel
    Reject {
        /// Parcel id
        id: u64,
    },

    /// Mark a parcel as disputed
    Dispute {
        /// Parcel id
        id: u64,
    },

    /// Transfer an approved parcel to a new owner
    Transfer {
        /// Parcel id
        id: u64,
        /// New owner wallet
        #[arg(long)]
        wallet: String,
        /// New owner name
        #[arg(long)]
        name: Option<String>,
    },

    /// Per-status totals
    Stats,

    /// List council members
    Council,

    /// List districts
    Districts,

    /// Council login
    Login {
        #[arg(long)]
        id: String,
        #[arg(long)]
        password: String,
        /// Acting council member
        #[arg(short, long)]
        member: Option<String>,
    },

    /// Council logout
    Logout,
}

#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// Khasra number
    #[arg(long)]
    pub khasra: String,
    /// Owner name
    #[arg(long)]
    pub owner: String,
    /// Owner wallet address
    #[arg(long, default_value = "0x")]
    pub wallet: String,
    #[arg(long)]
    pub district: String,
    #[arg(long, default_value = "")]
    pub tehsil: String,
    #[arg(long, default_value = "")]
    pub village: String,
    /// Area in square meters
    #[arg(long, default_value = "0")]
    pub area: f64,
    /// Document content identifier
    #[arg(long)]
    pub cid: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
    #[arg(long)]
    pub map_link: Option<String>,
}

impl From<SubmitArgs> for NewParcel {
    fn from(args: SubmitArgs) -> Self {
        NewParcel {
            khasra_number: args.khasra,
            owner_name: args.owner,
            owner_wallet: args.wallet,
            district: args.district,
            tehsil: args.tehsil,
            village: args.village,
            area: args.area,
            document_cid: args.cid,
            notes: args.notes,
            map_link: args.map_link,
        }
    }
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Parcel id
    #[arg(long)]
    pub khasra_id: Option<String>,
    #[arg(long)]
    pub district: Option<String>,
    #[arg(long)]
    pub tehsil: Option<String>,
    #[arg(long)]
    pub village: Option<String>,
    #[arg(long)]
    pub khasra_number: Option<String>,
    #[arg(long)]
    pub owner: Option<String>,
    /// Repeat to allow several statuses
    #[arg(long)]
    pub status: Vec<ParcelStatus>,
}

impl From<SearchArgs> for SearchCriteria {
    fn from(args: SearchArgs) -> Self {
        SearchCriteria {
            khasra_id: args.khasra_id,
            district: args.district,
            tehsil: args.tehsil,
            village: args.village,
            khasra_number: args.khasra_number,
            owner_name: args.owner,
            statuses: args.status,
        }
    }
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    #[arg(long)]
    pub khasra: Option<String>,
    #[arg(long)]
    pub owner: Option<String>,
    #[arg(long)]
    pub wallet: Option<String>,
    #[arg(long)]
    pub district: Option<String>,
    #[arg(long)]
    pub tehsil: Option<String>,
    #[arg(long)]
    pub village: Option<String>,
    #[arg(long)]
    pub area: Option<f64>,
    #[arg(long)]
    pub cid: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
    #[arg(long)]
    pub map_link: Option<String>,
}

impl From<UpdateArgs> for ParcelUpdate {
    fn from(args: UpdateArgs) -> Self {
        ParcelUpdate {
            khasra_number: args.khasra,
            owner_name: args.owner,
            owner_wallet: args.wallet,
            district: args.district,
            tehsil: args.tehsil,
            village: args.village,
            area: args.area,
            document_cid: args.cid,
            notes: args.notes,
            map_link: args.map_link,
        }
    }
}

/// Everything a command may touch
pub struct Registry {
    pub store: ParcelStore,
    pub roster: CouncilRoster,
    pub session: CouncilSession,
}

impl Registry {
    pub fn new(
        backend: Arc<dyn KeyValueStore>,
        config: &land_registry::Config,
        events: Arc<EventBus>,
    ) -> Self {
        let store = ParcelStore::open(backend.clone())
            .with_policy(config.approval_policy())
            .with_events(events);
        Self {
            store,
            roster: CouncilRoster::load(&backend),
            session: CouncilSession::new(backend, config.credentials()),
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Run one command
pub fn execute(registry: &mut Registry, command: Commands) -> Result<()> {
    match command {
        Commands::Submit(args) => {
            let id = registry.store.add_parcel(args.into())?;
            println!("Parcel submitted! ID: {}", id);
        }

        Commands::Show { id } => {
            let parcel = registry
                .store
                .get_parcel(id)
                .ok_or_else(|| anyhow!("Parcel {} not found", id))?;
            print_json(parcel)?;
        }

        Commands::Search(args) => {
            let criteria: SearchCriteria = args.into();
            let results = registry.store.search_parcels(&criteria);
            info!(matches = results.len(), "Search complete");
            print_json(&results)?;
        }

        Commands::Update { id, fields } => {
            let update: ParcelUpdate = fields.into();
            if update.is_empty() {
                bail!("nothing to update");
            }
            print_json(&registry.store.update_parcel(id, &update)?)?;
        }

        Commands::Delete { id } => {
            registry.store.delete_parcel(id)?;
            println!("Parcel {} deleted", id);
        }

        Commands::Withdraw { id, wallet } => {
            registry.store.withdraw(id, &wallet)?;
            println!("Parcel {} withdrawn", id);
        }

        Commands::Approve { id, member } => {
            let key = match member {
                Some(key) => key,
                None => registry
                    .session
                    .current()?
                    .and_then(|login| login.member_name)
                    .context("no acting council member: log in with --member or pass --member")?,
            };
            let member = registry.roster.resolve(&key)?.clone();
            print_json(&registry.store.approve(id, &member)?)?;
        }

        Commands::Reject { id } => {
            print_json(&registry.store.reject(id)?)?;
        }

        Commands::Dispute { id } => {
            print_json(&registry.store.dispute(id)?)?;
        }

        Commands::Transfer { id, wallet, name } => {
            print_json(&registry.store.transfer_ownership(id, &wallet, name.as_deref())?)?;
        }

        Commands::Stats => {
            print_json(&registry.store.status_counts())?;
        }

        Commands::Council => {
            print_json(&registry.roster.members())?;
        }

        Commands::Districts => {
            for district in DEFAULT_DISTRICTS {
                println!("{}", district);
            }
        }

        Commands::Login { id, password, member } => {
            if let Some(name) = &member {
                registry.roster.resolve(name)?;
            }
            if !registry.session.login(&id, &password, member.as_deref())? {
                bail!("invalid council ID or password");
            }
            println!("Council login successful");
        }

        Commands::Logout => {
            registry.session.logout()?;
            println!("Logged out");
        }
    }

    Ok(())
}
