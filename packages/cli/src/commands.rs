use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Subcommand};
use journal::media::{NormalizeOptions, Upload};
use journal::{ImportMode, Journal, MediaOwner, Scope};
use tracing::info;

use crate::config::FitlogConfig;

#[derive(Subcommand)]
pub enum Command {
    /// Write an export document
    Export {
        /// Collections to include: all, train, food or progress
        #[arg(short, long, default_value = "all")]
        scope: Scope,

        /// Embed every media record in the document
        #[arg(short, long)]
        media: bool,

        /// Output file (default: a dated name in the current directory)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Import an export document
    Import {
        /// Document to import
        file: PathBuf,

        /// replace: discard local data in scope; add: merge into it
        #[arg(short, long, default_value = "add")]
        mode: ImportMode,

        /// Collections to import: all, train, food or progress
        #[arg(short, long, default_value = "all")]
        scope: Scope,
    },

    /// Reclaim media no record references (preview unless --execute)
    Gc {
        #[arg(long)]
        execute: bool,
    },

    /// Media store usage
    Stats,

    /// Inspect stored media
    #[command(subcommand)]
    Media(MediaCommand),

    /// Upload files and attach them to an exercise or meal
    Attach(AttachArgs),

    /// Report dangling references and orphaned records
    Check,

    /// Per-day exercise counts and weight progress
    Summary,

    /// Run pending data migrations
    Migrate,

    /// Print the effective configuration
    Config,
}

#[derive(Subcommand)]
pub enum MediaCommand {
    /// List stored media with reference counts
    List,
}

#[derive(Args)]
#[group(required = true, multiple = false, id = "owner")]
pub struct AttachTarget {
    /// Exercise id
    #[arg(long)]
    exercise: Option<String>,

    /// Meal id
    #[arg(long)]
    meal: Option<String>,
}

#[derive(Args)]
pub struct AttachArgs {
    #[command(flatten)]
    target: AttachTarget,

    /// Image or video files
    #[arg(required = true, num_args = 1..)]
    files: Vec<PathBuf>,
}

impl AttachTarget {
    fn owner(self) -> anyhow::Result<MediaOwner> {
        match (self.exercise, self.meal) {
            (Some(id), None) => Ok(MediaOwner::Exercise(id)),
            (None, Some(id)) => Ok(MediaOwner::Meal(id)),
            _ => bail!("pass exactly one of --exercise or --meal"),
        }
    }
}

pub async fn run(command: Command, config: FitlogConfig) -> anyhow::Result<()> {
    if let Command::Config = command {
        print!("{}", config.to_toml().context("Failed to render config")?);
        return Ok(());
    }

    let journal = Journal::open(&config.storage)
        .await
        .context("Failed to open journal storage")?
        .with_normalize(NormalizeOptions::from(&config.media))
        .with_app_name(config.export.app_name.clone());

    let migration = journal.startup().await.context("Startup migration failed")?;
    if !migration.skipped {
        info!(converted = migration.converted, "Schema brought up to date");
    }

    match command {
        Command::Export { scope, media, out } => {
            let json = journal.export_json(scope, media).await?;
            let path = out.unwrap_or_else(|| PathBuf::from(journal.export_file_name(scope, media)));
            tokio::fs::write(&path, json)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Exported {scope} to {}", path.display());
        }
        Command::Import { file, mode, scope } => {
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let report = journal.import_str(&raw, mode, scope).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Gc { execute } => {
            let report = journal.reclaim_unused(!execute).await?;
            println!(
                "{} unused media; {} records / {} bytes -> {} records / {} bytes{}",
                report.unused_count,
                report.before.count,
                report.before.bytes,
                report.after.count,
                report.after.bytes,
                if report.dry_run { " (preview, pass --execute to delete)" } else { "" }
            );
        }
        Command::Stats => {
            let stats = journal.stats().await?;
            println!("{} media records, {} bytes", stats.count, stats.bytes);
        }
        Command::Media(MediaCommand::List) => {
            for item in journal.media_list().await? {
                println!(
                    "{}\t{}\t{} bytes\t{} refs",
                    item.meta.id, item.meta.mime_type, item.meta.size, item.references
                );
            }
        }
        Command::Attach(args) => {
            let owner = args.target.owner()?;
            let uploads = read_uploads(&args.files).await?;
            let results = journal.attach_uploads(&owner, uploads).await?;
            let mut failed = 0;
            for (path, result) in args.files.iter().zip(results) {
                match result {
                    Ok(media_ref) => println!("{}\tattached as {}", path.display(), media_ref.local_id),
                    Err(e) => {
                        failed += 1;
                        eprintln!("{}\t{e}", path.display());
                    }
                }
            }
            if failed > 0 {
                bail!("{failed} file(s) could not be attached");
            }
        }
        Command::Check => {
            let report = journal.check().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.is_clean() {
                bail!("integrity problems found");
            }
        }
        Command::Summary => {
            for day in journal.day_summaries().await? {
                println!("{}\t{}\t{}/{} done", day.day_id, day.title, day.done, day.exercises);
            }
            if let Some(weight) = journal.progress_summary().await?.weight {
                println!(
                    "weight: {:.1} kg -> {:.1} kg ({:+.1} kg)",
                    weight.initial, weight.current, weight.difference
                );
            }
        }
        Command::Migrate => {
            println!(
                "{}",
                if migration.skipped {
                    "Already up to date".to_string()
                } else {
                    format!(
                        "Moved {} inline media entries from {} records",
                        migration.converted, migration.records_updated
                    )
                }
            );
        }
        // Printed before storage was opened.
        Command::Config => {}
    }
    Ok(())
}

async fn read_uploads(files: &[PathBuf]) -> anyhow::Result<Vec<Upload>> {
    let mut uploads = Vec::with_capacity(files.len());
    for path in files {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        uploads.push(Upload::new(file_name(path), guess_mime(path), bytes));
    }
    Ok(uploads)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn guess_mime(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
