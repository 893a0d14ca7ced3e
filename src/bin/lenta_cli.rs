use std::{str::FromStr, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use lenta_gestionale::{
    config::{self, AppConfig},
    db::{self, DbPool},
    entities::{warehouse_item, Role},
    services::{
        users::{NewUser, UserService},
        warehouse::{ledger::ItemBalance, LedgerService},
    },
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::Serialize;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Migrate => {
            db::run_migrations(&context.db)
                .await
                .context("failed to run migrations")?;
            println!("Migrations applied");
        }
        Commands::CreateUser(args) => handle_create_user(&context, args, cli.json).await?,
        Commands::Balance(args) => handle_balance(&context, args, cli.json).await?,
        Commands::LowStock => handle_low_stock(&context, cli.json).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "lenta-cli",
    about = "Lenta Gestionale administration: migrations, accounts and stock checks",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Create a user account
    CreateUser(CreateUserArgs),
    /// Show the current balance of an item
    Balance(BalanceArgs),
    /// List active items at or below their minimum threshold
    LowStock,
}

#[derive(Args)]
struct CreateUserArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    #[arg(long)]
    full_name: Option<String>,
    /// admin, manager, caposquadra, magazzino, contabilita or hr
    #[arg(long, default_value = "caposquadra")]
    role: String,
    /// `it` or `fr`
    #[arg(long)]
    language: Option<String>,
    #[arg(long, action = ArgAction::SetTrue)]
    warehouse_manager: bool,
}

#[derive(Args)]
struct BalanceArgs {
    /// Item code, e.g. `bolt-001`
    code: String,
}

struct CliContext {
    _config: AppConfig,
    db: Arc<DbPool>,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;

        Ok(Self {
            _config: config,
            db: Arc::new(db_pool),
        })
    }

    fn user_service(&self) -> UserService {
        UserService::new(self.db.clone())
    }

    fn ledger_service(&self) -> LedgerService {
        LedgerService::new(self.db.clone())
    }
}

async fn handle_create_user(context: &CliContext, args: CreateUserArgs, json: bool) -> Result<()> {
    let role = Role::from_str(&args.role.to_lowercase())
        .map_err(|_| anyhow!("unknown role '{}'", args.role))?;

    let user = context
        .user_service()
        .create(
            None,
            NewUser {
                email: args.email,
                password: args.password,
                full_name: args.full_name,
                role,
                language: args.language,
                is_active: true,
                is_warehouse_manager: args.warehouse_manager,
            },
        )
        .await
        .context("failed to create user")?;

    if json {
        print_json(&serde_json::json!({
            "id": user.id,
            "email": user.email,
            "role": user.role,
        }))?;
    } else {
        println!("Created {} ({}) with id {}", user.email, user.role, user.id);
    }
    Ok(())
}

async fn handle_balance(context: &CliContext, args: BalanceArgs, json: bool) -> Result<()> {
    let item = warehouse_item::Entity::find()
        .filter(warehouse_item::Column::Code.eq(args.code.trim()))
        .one(&*context.db)
        .await
        .context("failed to look up item")?
        .ok_or_else(|| anyhow!("no item with code '{}'", args.code))?;

    let balance = context
        .ledger_service()
        .item_balance(item.id)
        .await
        .context("failed to compute balance")?;

    if json {
        print_json(&balance)?;
    } else {
        render_balance(&balance);
    }
    Ok(())
}

async fn handle_low_stock(context: &CliContext, json: bool) -> Result<()> {
    let items = context
        .ledger_service()
        .under_threshold()
        .await
        .context("failed to list under-threshold items")?;

    if json {
        return print_json(&items);
    }
    if items.is_empty() {
        println!("No items under threshold");
        return Ok(());
    }
    for item in &items {
        render_balance(item);
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_balance(item: &ItemBalance) {
    let flag = if item.under_threshold { " (under threshold)" } else { "" };
    println!(
        "- {} • {} • {} {} • min {}{}",
        item.code, item.name, item.balance, item.unit, item.min_threshold, flag
    );
}
