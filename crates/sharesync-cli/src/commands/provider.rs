//! Provider command - Direct admin access to one cloud-drive account
//!
//! Provides the `sharesync provider` CLI subcommands, a thin pass-through
//! onto [`ProviderClient`] (C1) for every operation the sync engine itself
//! never calls: listing, housekeeping, and the supplemental recycle-bin /
//! search / rename / move / copy capabilities (spec §6.5). Every subcommand
//! takes `--account <id>` to resolve credentials and build a client.

use clap::{Args, Subcommand, ValueEnum};

use anyhow::{Context, Result};
use sharesync_core::domain::newtypes::AccountId;
use sharesync_core::domain::SourceType as CoreSourceType;
use sharesync_core::ports::{NoopFilter, OrderBy as CoreOrderBy, OrderDirection as CoreOrderDirection, Speed as CoreSpeed};

use crate::commands::{client_for, load_account, open_state};
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SourceTypeArg {
    Friend,
    Group,
}

impl From<SourceTypeArg> for CoreSourceType {
    fn from(value: SourceTypeArg) -> Self {
        match value {
            SourceTypeArg::Friend => CoreSourceType::Friend,
            SourceTypeArg::Group => CoreSourceType::Group,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OrderByArg {
    Name,
    Time,
    Size,
}

impl From<OrderByArg> for CoreOrderBy {
    fn from(value: OrderByArg) -> Self {
        match value {
            OrderByArg::Name => CoreOrderBy::Name,
            OrderByArg::Time => CoreOrderBy::Time,
            OrderByArg::Size => CoreOrderBy::Size,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OrderDirectionArg {
    Asc,
    Desc,
}

impl From<OrderDirectionArg> for CoreOrderDirection {
    fn from(value: OrderDirectionArg) -> Self {
        match value {
            OrderDirectionArg::Asc => CoreOrderDirection::Asc,
            OrderDirectionArg::Desc => CoreOrderDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SpeedArg {
    Normal,
    Slow,
    Fast,
}

impl From<SpeedArg> for CoreSpeed {
    fn from(value: SpeedArg) -> Self {
        match value {
            SpeedArg::Normal => CoreSpeed::Normal,
            SpeedArg::Slow => CoreSpeed::Slow,
            SpeedArg::Fast => CoreSpeed::Fast,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum ProviderCommand {
    /// Fetch identity, quota, and vip flags
    UserInfo(AccountArgs),
    /// Flattened listing rooted at a path on the account's own drive
    ListDisk(ListDiskArgs),
    /// Listing rooted within a share exposed by a friend/group
    ListShare(ListShareArgs),
    /// Create a directory
    Mkdir(MkdirArgs),
    /// Remove items by path and/or id
    Remove(RemoveArgs),
    /// Copy shared items into a target directory
    Transfer(TransferArgs),
    /// List friends or groups
    Relationships(RelationshipsArgs),
    /// Rename one item
    Rename(RenameArgs),
    /// Move one item
    Move(MoveArgs),
    /// Copy one item
    Copy(CopyArgs),
    /// Search by keyword
    Search(SearchArgs),
    /// List the recycle bin
    RecycleList(AccountArgs),
    /// Restore items from the recycle bin
    Restore(RestoreArgs),
    /// Empty the recycle bin
    ClearRecycle(AccountArgs),
}

#[derive(Debug, Args)]
pub struct AccountArgs {
    #[arg(long)]
    pub account: AccountId,
}

#[derive(Debug, Args)]
pub struct ListDiskArgs {
    #[arg(long)]
    pub account: AccountId,
    #[arg(long)]
    pub path: String,
    #[arg(long)]
    pub file_id: Option<String>,
    #[arg(long, default_value_t = false)]
    pub recursive: bool,
    #[arg(long, value_enum, default_value = "normal")]
    pub speed: SpeedArg,
    #[arg(long, value_enum, default_value = "name")]
    pub order_by: OrderByArg,
    #[arg(long, value_enum, default_value = "asc")]
    pub direction: OrderDirectionArg,
}

#[derive(Debug, Args)]
pub struct ListShareArgs {
    #[arg(long)]
    pub account: AccountId,
    #[arg(long, value_enum)]
    pub source_type: SourceTypeArg,
    #[arg(long)]
    pub source_id: String,
    #[arg(long)]
    pub path: String,
    #[arg(long, default_value_t = false)]
    pub recursive: bool,
    #[arg(long, value_enum, default_value = "normal")]
    pub speed: SpeedArg,
}

#[derive(Debug, Args)]
pub struct MkdirArgs {
    #[arg(long)]
    pub account: AccountId,
    #[arg(long)]
    pub path: String,
    #[arg(long)]
    pub parent_id: Option<String>,
    #[arg(long)]
    pub name: String,
    #[arg(long, default_value_t = true)]
    pub return_if_exists: bool,
}

#[derive(Debug, Args)]
pub struct RemoveArgs {
    #[arg(long)]
    pub account: AccountId,
    #[arg(long = "path", num_args = 0..)]
    pub paths: Vec<String>,
    #[arg(long = "id", num_args = 0..)]
    pub ids: Vec<String>,
}

#[derive(Debug, Args)]
pub struct TransferArgs {
    #[arg(long)]
    pub account: AccountId,
    #[arg(long, value_enum)]
    pub source_type: SourceTypeArg,
    #[arg(long)]
    pub source_id: String,
    #[arg(long)]
    pub source_path: String,
    #[arg(long)]
    pub target_path: String,
    #[arg(long)]
    pub target_id: Option<String>,
    #[arg(long = "file-id", num_args = 1..)]
    pub file_ids: Vec<String>,
}

#[derive(Debug, Args)]
pub struct RelationshipsArgs {
    #[arg(long)]
    pub account: AccountId,
    #[arg(long, value_enum)]
    pub kind: SourceTypeArg,
}

#[derive(Debug, Args)]
pub struct RenameArgs {
    #[arg(long)]
    pub account: AccountId,
    #[arg(long)]
    pub path: String,
    #[arg(long)]
    pub new_name: String,
}

#[derive(Debug, Args)]
pub struct MoveArgs {
    #[arg(long)]
    pub account: AccountId,
    #[arg(long)]
    pub path: String,
    #[arg(long)]
    pub target_path: String,
}

#[derive(Debug, Args)]
pub struct CopyArgs {
    #[arg(long)]
    pub account: AccountId,
    #[arg(long)]
    pub path: String,
    #[arg(long)]
    pub target_path: String,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[arg(long)]
    pub account: AccountId,
    #[arg(long)]
    pub keyword: String,
    #[arg(long)]
    pub path: Option<String>,
}

#[derive(Debug, Args)]
pub struct RestoreArgs {
    #[arg(long)]
    pub account: AccountId,
    #[arg(long = "id", num_args = 1..)]
    pub ids: Vec<String>,
}

impl ProviderCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let state = open_state().await?;

        match self {
            ProviderCommand::UserInfo(args) => {
                let account = load_account(&state, args.account).await?;
                let client = client_for(account.drive_type(), account.credentials());
                let info = client.get_user_info().await.context("get_user_info failed")?;
                if matches!(format, OutputFormat::Json) {
                    formatter.print_json(&serde_json::json!({
                        "user_id": info.user_id,
                        "display_name": info.display_name,
                        "quota_used": info.quota_used,
                        "quota_total": info.quota_total,
                        "is_vip": info.is_vip,
                        "is_supervip": info.is_supervip,
                    }));
                } else {
                    formatter.success(&format!("{} ({})", info.display_name, info.user_id));
                    formatter.info(&format!("Quota: {} / {}", info.quota_used, info.quota_total));
                }
            }

            ProviderCommand::ListDisk(args) => {
                let account = load_account(&state, args.account).await?;
                let client = client_for(account.drive_type(), account.credentials());
                let items = client
                    .list_disk(
                        &args.path,
                        args.file_id.as_deref(),
                        args.recursive,
                        args.speed.into(),
                        args.order_by.into(),
                        args.direction.into(),
                        &NoopFilter,
                    )
                    .await
                    .context("list_disk failed")?;
                print_listing(&*formatter, format, &items);
            }

            ProviderCommand::ListShare(args) => {
                let account = load_account(&state, args.account).await?;
                let client = client_for(account.drive_type(), account.credentials());
                let items = client
                    .list_share(
                        args.source_type.into(),
                        &args.source_id,
                        &args.path,
                        args.recursive,
                        args.speed.into(),
                        &NoopFilter,
                    )
                    .await
                    .context("list_share failed")?;
                print_listing(&*formatter, format, &items);
            }

            ProviderCommand::Mkdir(args) => {
                let account = load_account(&state, args.account).await?;
                let client = client_for(account.drive_type(), account.credentials());
                let created = client
                    .mkdir(&args.path, args.parent_id.as_deref(), &args.name, args.return_if_exists)
                    .await
                    .context("mkdir failed")?;
                if matches!(format, OutputFormat::Json) {
                    formatter.print_json(&serde_json::json!({
                        "file_id": created.file_id,
                        "file_path": created.file_path,
                    }));
                } else {
                    formatter.success(&format!("Created {} ({})", created.file_path, created.file_id));
                }
            }

            ProviderCommand::Remove(args) => {
                let account = load_account(&state, args.account).await?;
                let client = client_for(account.drive_type(), account.credentials());
                let ok = client
                    .remove(&args.paths, &args.ids)
                    .await
                    .context("remove failed")?;
                report_bool(&*formatter, format, ok, "remove");
            }

            ProviderCommand::Transfer(args) => {
                let account = load_account(&state, args.account).await?;
                let client = client_for(account.drive_type(), account.credentials());
                let ok = client
                    .transfer(
                        args.source_type.into(),
                        &args.source_id,
                        &args.source_path,
                        &args.target_path,
                        args.target_id.as_deref(),
                        &args.file_ids,
                        Default::default(),
                    )
                    .await
                    .context("transfer failed")?;
                report_bool(&*formatter, format, ok, "transfer");
            }

            ProviderCommand::Relationships(args) => {
                let account = load_account(&state, args.account).await?;
                let client = client_for(account.drive_type(), account.credentials());
                let items = client
                    .get_relationships(args.kind.into())
                    .await
                    .context("get_relationships failed")?;
                if matches!(format, OutputFormat::Json) {
                    let json: Vec<_> = items
                        .iter()
                        .map(|r| serde_json::json!({"user_id": r.user_id, "display_name": r.display_name}))
                        .collect();
                    formatter.print_json(&serde_json::json!({ "relationships": json }));
                } else {
                    formatter.success(&format!("{} relationship(s)", items.len()));
                    for r in &items {
                        formatter.info(&format!("  {} ({})", r.display_name, r.user_id));
                    }
                }
            }

            ProviderCommand::Rename(args) => {
                let account = load_account(&state, args.account).await?;
                let client = client_for(account.drive_type(), account.credentials());
                let renamed = client
                    .rename(&args.path, &args.new_name)
                    .await
                    .context("rename failed")?;
                formatter.success(&format!("Renamed to {}", renamed.file_path));
            }

            ProviderCommand::Move(args) => {
                let account = load_account(&state, args.account).await?;
                let client = client_for(account.drive_type(), account.credentials());
                let ok = client
                    .move_item(&args.path, &args.target_path)
                    .await
                    .context("move failed")?;
                report_bool(&*formatter, format, ok, "move");
            }

            ProviderCommand::Copy(args) => {
                let account = load_account(&state, args.account).await?;
                let client = client_for(account.drive_type(), account.credentials());
                let ok = client
                    .copy_item(&args.path, &args.target_path)
                    .await
                    .context("copy failed")?;
                report_bool(&*formatter, format, ok, "copy");
            }

            ProviderCommand::Search(args) => {
                let account = load_account(&state, args.account).await?;
                let client = client_for(account.drive_type(), account.credentials());
                let items = client
                    .search(&args.keyword, args.path.as_deref())
                    .await
                    .context("search failed")?;
                print_listing(&*formatter, format, &items);
            }

            ProviderCommand::RecycleList(args) => {
                let account = load_account(&state, args.account).await?;
                let client = client_for(account.drive_type(), account.credentials());
                let items = client.get_recycle_list().await.context("get_recycle_list failed")?;
                print_listing(&*formatter, format, &items);
            }

            ProviderCommand::Restore(args) => {
                let account = load_account(&state, args.account).await?;
                let client = client_for(account.drive_type(), account.credentials());
                let ok = client.restore(&args.ids).await.context("restore failed")?;
                report_bool(&*formatter, format, ok, "restore");
            }

            ProviderCommand::ClearRecycle(args) => {
                let account = load_account(&state, args.account).await?;
                let client = client_for(account.drive_type(), account.credentials());
                let ok = client.clear_recycle().await.context("clear_recycle failed")?;
                report_bool(&*formatter, format, ok, "clear_recycle");
            }
        }

        Ok(())
    }
}

fn print_listing(
    formatter: &dyn crate::output::OutputFormatter,
    format: OutputFormat,
    items: &[sharesync_core::domain::BaseFileInfo],
) {
    if matches!(format, OutputFormat::Json) {
        let json: Vec<_> = items
            .iter()
            .map(|i| {
                serde_json::json!({
                    "file_id": i.file_id,
                    "file_name": i.file_name,
                    "file_path": i.file_path,
                    "is_folder": i.is_folder,
                    "file_size": i.file_size,
                })
            })
            .collect();
        formatter.print_json(&serde_json::json!({ "items": json }));
    } else {
        formatter.success(&format!("{} item(s)", items.len()));
        for item in items {
            let kind = if item.is_folder { "d" } else { "f" };
            formatter.info(&format!("  [{kind}] {} ({} bytes)", item.file_path, item.file_size));
        }
    }
}

fn report_bool(formatter: &dyn crate::output::OutputFormatter, format: OutputFormat, ok: bool, verb: &str) {
    if matches!(format, OutputFormat::Json) {
        formatter.print_json(&serde_json::json!({ "success": ok }));
    } else if ok {
        formatter.success(&format!("{verb} succeeded"));
    } else {
        formatter.error(&format!("{verb} reported failure"));
    }
}
