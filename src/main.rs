//! ScalerKit - upscaler and frame-generation mod manager
//!
//! Command-line front end over the `scalerkit` library.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use scalerkit::config::AppConfig;
use scalerkit::ini::{FrameGenMode, GpuSpoof, OptionTable, QualityMode, ScalerOptions, UpscalerBackend};
use scalerkit::installers::{CombinedOutcome, InstallOptions, InstallReport};
use scalerkit::logging::{init_logger, log_error, log_info, log_warning};
use scalerkit::mod_source::{ModKind, ModSourceDescriptor, SpoofName};
use scalerkit::updater::FullUpdateOutcome;
use scalerkit::ModManager;

#[derive(Parser)]
#[command(name = "scalerkit", version, about = "Install and update OptiScaler and frame-generation mods")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Upscaler,
    Framegen,
}

impl From<KindArg> for ModKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Upscaler => ModKind::Upscaler,
            KindArg::Framegen => ModKind::FrameGen,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// List every detected game and its mod state
    Scan {
        /// Ignore the scan cache
        #[arg(long)]
        refresh: bool,
        #[arg(long)]
        json: bool,
    },
    /// Install a mod from an extracted release folder
    Install {
        target: PathBuf,
        #[arg(long)]
        source: PathBuf,
        #[arg(long, value_enum, default_value = "upscaler")]
        kind: KindArg,
        /// Frame-generation release folder installed after the upscaler
        #[arg(long)]
        with_framegen: Option<PathBuf>,
        /// Filename the upscaler payload is renamed to (dxgi, winmm, version, ...)
        #[arg(long, value_parser = parse_spoof, default_value = "dxgi")]
        spoof: SpoofName,
        /// INI codes; any of these makes the install rewrite OptiScaler.ini
        #[arg(long)]
        gpu_spoof: Option<String>,
        #[arg(long)]
        frame_gen: Option<String>,
        #[arg(long)]
        upscaler: Option<String>,
        #[arg(long)]
        quality: Option<String>,
        #[arg(long)]
        quality_override: bool,
    },
    /// Remove every mod file from the given game folders
    Uninstall {
        #[arg(required = true)]
        targets: Vec<PathBuf>,
    },
    /// Move `.bak` files back over their originals
    Restore {
        target: PathBuf,
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Resolve leftover backups, optionally removing mod logs
    Clean {
        target: PathBuf,
        #[arg(long)]
        logs: bool,
    },
    /// Installed state of a game folder
    Status { target: PathBuf },
    /// Manage the extra library folders scanned for games
    Folder {
        #[command(subcommand)]
        action: FolderAction,
    },
    /// Drop cached scan results, feed data and partial downloads
    ClearCache,
    /// Fetch the newest release and update the given games
    Update {
        games: Vec<PathBuf>,
        /// Only report whether a newer release exists
        #[arg(long)]
        check: bool,
    },
}

#[derive(Subcommand)]
enum FolderAction {
    Add { path: PathBuf },
    Remove { path: PathBuf },
    List,
}

/// Folder commands edit the saved config, so they run before the engine starts
fn run_folder_action(action: FolderAction) -> bool {
    let mut config = AppConfig::load();
    match action {
        FolderAction::Add { path } => {
            if config.add_scan_folder(&path) {
                config.save();
                println!("Added {}", path.display());
            } else {
                println!("{} is already registered", path.display());
            }
        }
        FolderAction::Remove { path } => {
            if config.remove_scan_folder(&path) {
                config.save();
                println!("Removed {}", path.display());
            } else {
                println!("{} is not registered", path.display());
                return false;
            }
        }
        FolderAction::List => {
            for folder in &config.user_scan_folders {
                println!("{}", folder.display());
            }
        }
    }
    true
}

fn parse_spoof(value: &str) -> Result<SpoofName, String> {
    SpoofName::parse(value).ok_or_else(|| format!("unknown spoof name: {}", value))
}

fn build_options(
    gpu_spoof: Option<String>,
    frame_gen: Option<String>,
    upscaler: Option<String>,
    quality: Option<String>,
    quality_override: bool,
) -> Option<ScalerOptions> {
    if gpu_spoof.is_none() && frame_gen.is_none() && upscaler.is_none() && quality.is_none() && !quality_override {
        return None;
    }
    Some(ScalerOptions {
        gpu_spoof: gpu_spoof.map_or(GpuSpoof::AUTO, |c| GpuSpoof::from_code(&c)),
        frame_gen: frame_gen.map_or(FrameGenMode::AUTO, |c| FrameGenMode::from_code(&c)),
        upscaler: upscaler.map_or(UpscalerBackend::AUTO, |c| UpscalerBackend::from_code(&c)),
        quality: quality.map_or(QualityMode::AUTO, |c| QualityMode::from_code(&c)),
        quality_override,
    })
}

fn print_report(report: &InstallReport) {
    println!(
        "{}: {} files, {} directories into {}",
        report.kind.display_name(),
        report.files_copied.len(),
        report.dirs_replaced.len(),
        report.target.display()
    );
    if let Some(spoof) = &report.spoof_file {
        println!("  payload renamed to {}", spoof);
    }
    for backup in &report.backups {
        println!("  backup: {}", backup.display());
    }
    for warning in &report.warnings {
        println!("  warning: {}", warning);
    }
}

fn main() -> ExitCode {
    init_logger();
    log_info("ScalerKit CLI starting");

    let cli = Cli::parse();
    let command = match cli.command {
        Command::Folder { action } => {
            return if run_folder_action(action) {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            };
        }
        other => other,
    };
    let manager = ModManager::new(AppConfig::load());

    let cancelled = Arc::new(AtomicBool::new(false));
    {
        let cancelled = Arc::clone(&cancelled);
        if let Err(e) = ctrlc::set_handler(move || cancelled.store(true, Ordering::SeqCst)) {
            log_warning(&format!("Could not install Ctrl-C handler: {}", e));
        }
    }

    let ok = match command {
        Command::Scan { refresh, json } => {
            let games = manager.scan(!refresh);
            if json {
                match serde_json::to_string_pretty(&games) {
                    Ok(text) => println!("{}", text),
                    Err(e) => log_error(&format!("Failed to serialize games: {}", e)),
                }
            } else {
                for game in &games {
                    println!(
                        "{:<40} {:<7} {:?} {}",
                        game.display_name,
                        game.platform.display_name(),
                        game.mod_status,
                        game.install_path.display()
                    );
                }
                println!("{} games", games.len());
            }
            true
        }

        Command::Install {
            target,
            source,
            kind,
            with_framegen,
            spoof,
            gpu_spoof,
            frame_gen,
            upscaler,
            quality,
            quality_override,
        } => {
            let options = InstallOptions {
                spoof,
                config: build_options(gpu_spoof, frame_gen, upscaler, quality, quality_override),
            };
            let primary = ModSourceDescriptor::new(source, kind.into());

            match with_framegen {
                Some(fg) => {
                    let secondary = ModSourceDescriptor::new(fg, ModKind::FrameGen);
                    match manager.install_combined(&primary, &secondary, &target, &options) {
                        CombinedOutcome::Complete { primary, secondary } => {
                            print_report(&primary);
                            print_report(&secondary);
                            true
                        }
                        CombinedOutcome::PrimaryOnly { primary, secondary_error } => {
                            print_report(&primary);
                            eprintln!("Frame generation not installed: {}", secondary_error);
                            false
                        }
                        CombinedOutcome::Failed { error } => {
                            eprintln!("Install failed: {}", error);
                            false
                        }
                    }
                }
                None => match manager.install(&primary, &target, &options) {
                    Ok(report) => {
                        print_report(&report);
                        true
                    }
                    Err(e) => {
                        eprintln!("Install failed: {}", e);
                        false
                    }
                },
            }
        }

        Command::Uninstall { targets } => {
            let mut ok = true;
            for (target, report) in manager.uninstall_many(&targets) {
                println!("{}: removed {} items", target.display(), report.removed.len());
                for failed in &report.failed {
                    println!("  could not remove {}", failed);
                }
                for backup in &report.restorable_backups {
                    println!("  restorable: {}", backup.display());
                }
                ok &= report.success;
            }
            ok
        }

        Command::Restore { target, names } => match manager.restore_backups(&target, &names) {
            Ok(restored) => {
                for name in &restored {
                    println!("restored {}", name);
                }
                true
            }
            Err(e) => {
                eprintln!("Restore failed: {}", e);
                false
            }
        },

        Command::Clean { target, logs } => {
            let ok = match manager.clean_orphan_backups(&target) {
                Ok(report) => {
                    println!(
                        "{} backups restored, {} removed",
                        report.restored.len(),
                        report.removed.len()
                    );
                    true
                }
                Err(e) => {
                    eprintln!("Clean failed: {}", e);
                    false
                }
            };
            if logs {
                println!("{} log files removed", manager.clean_logs(&target));
            }
            ok
        }

        Command::Status { target } => {
            println!("{}: {}", target.display(), manager.status(&target).display_name());
            true
        }

        Command::Folder { .. } => true,

        Command::ClearCache => {
            manager.cache().invalidate();
            match manager.config().clear_cache() {
                Ok(()) => {
                    println!("Cache cleared");
                    true
                }
                Err(e) => {
                    eprintln!("Failed to clear cache: {}", e);
                    false
                }
            }
        }

        Command::Update { games, check } => {
            if check {
                match manager.check_for_update() {
                    Ok(Some(release)) => {
                        println!("Latest release: {} ({})", release.version, release.asset_name);
                        true
                    }
                    Ok(None) => {
                        println!("No release published");
                        true
                    }
                    Err(e) => {
                        eprintln!("Update check failed: {}", e);
                        false
                    }
                }
            } else {
                let mut progress = |done: u64, total: Option<u64>| {
                    if let Some(total) = total.filter(|t| *t > 0) {
                        eprint!("\rDownloading: {}%", done * 100 / total);
                    }
                    !cancelled.load(Ordering::SeqCst)
                };
                match manager.update_all(&games, &mut progress) {
                    Ok(FullUpdateOutcome::NoRemoteRelease) => {
                        println!("No release published");
                        true
                    }
                    Ok(FullUpdateOutcome::AlreadyLatest { version }) => {
                        println!("Already at {}", version);
                        true
                    }
                    Ok(FullUpdateOutcome::Updated { version, folder, games }) => {
                        eprintln!();
                        println!("Installed {} into {}", version, folder.display());
                        let mut ok = true;
                        for (dir, result) in games {
                            match result {
                                Ok(report) => println!("  {}: {} files", dir.display(), report.files_updated.len()),
                                Err(e) => {
                                    println!("  {}: {}", dir.display(), e);
                                    ok = false;
                                }
                            }
                        }
                        ok
                    }
                    Err(e) => {
                        eprintln!();
                        eprintln!("Update failed: {}", e);
                        false
                    }
                }
            }
        }
    };

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
