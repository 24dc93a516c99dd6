use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use colored::*;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use dialoguer::Confirm;
use serde_json::json;

use crate::batch::{BatchFiles, LoadedBatch, PreviewedBatch, preview_label};
use crate::cli::{Cli, Commands, ConfigCommands};
use crate::config::Settings;
use crate::host::{BrowserDiscovery, SandboxPermissions, SteamProcess, SystemHost, UDEV_PATH};
use crate::launch::{BrowserDescriptor, KnownBrowser, LaunchProfile, known_browser};
use crate::paths;
use crate::shortcuts::{LoadCondition, ShortcutStore, StoreError};
use crate::ui::prelude::*;

/// Per-run inputs shared by every command
pub struct RunContext {
    pub settings: Settings,
    pub shortcuts: Option<PathBuf>,
    pub user: Option<String>,
    pub browser: Option<String>,
    pub force: bool,
    pub output: OutputFormat,
}

impl RunContext {
    pub fn from_cli(cli: &Cli, settings: Settings) -> Self {
        Self {
            settings,
            shortcuts: cli.shortcuts.clone(),
            user: cli.user.clone(),
            browser: cli.browser.clone(),
            force: cli.force,
            output: cli.output,
        }
    }

    fn shortcuts_path(&self) -> Result<PathBuf> {
        let explicit = self
            .shortcuts
            .as_deref()
            .or(self.settings.shortcuts_path.as_deref());
        let home = match explicit {
            Some(_) => PathBuf::new(),
            None => paths::home_dir()?,
        };
        paths::resolve_shortcuts_path(explicit, self.user.as_deref(), &home)
    }

    fn selected_browser(&self) -> Result<KnownBrowser> {
        let name = self.browser.as_deref().unwrap_or(self.settings.browser.as_str());
        known_browser(name).ok_or_else(|| anyhow!("Unsupported browser '{}'", name))
    }

    fn launch_profile(&self, store: &ShortcutStore) -> Result<LaunchProfile> {
        let browser = self.selected_browser()?;
        let descriptor = BrowserDescriptor::resolve(browser, store).map_err(|e| match e {
            StoreError::MissingReference { .. } => anyhow!(
                "No {} shortcut found in Steam. Add {} as a non-Steam game first.",
                browser.name,
                browser.name
            ),
            other => other.into(),
        })?;
        emit(
            Level::Debug,
            "launch.template",
            &format!(
                "Using {} template: exe={} start_dir={}",
                descriptor.display_name, descriptor.executable_path, descriptor.working_directory
            ),
            None,
        );

        Ok(LaunchProfile {
            browser: descriptor,
            browser_command: self.settings.browser_command.clone(),
            window: self.settings.window.clone(),
            user_agent_overrides: self.settings.user_agent_overrides.clone(),
            collection: self.settings.collection.clone(),
        })
    }

    fn ensure_steam_stopped(&self) -> Result<()> {
        if !self.force && SystemHost.is_running() {
            bail!(
                "Steam is currently running. Please close Steam before adding shortcuts.\n\
                 Steam overwrites shortcuts.vdf while running. Use --force to write anyway."
            );
        }
        Ok(())
    }
}

pub fn handle_command(command: Commands, ctx: &mut RunContext) -> Result<()> {
    match command {
        Commands::List => handle_list(ctx),
        Commands::Add { title, url } => handle_add(ctx, &title, &url),
        Commands::Preview { file } => handle_preview(ctx, file),
        Commands::Batch { file, ledger, yes } => handle_batch(ctx, file, ledger, yes),
        Commands::Merge { other } => handle_merge(ctx, &other),
        Commands::Browsers => handle_browsers(ctx),
        Commands::Permissions { fix } => handle_permissions(fix),
        Commands::Config { command } => handle_config(ctx, command.unwrap_or(ConfigCommands::Show)),
    }
}

/// Load the store, reporting a missing or corrupt file instead of failing.
fn load_store(path: &Path) -> Result<ShortcutStore> {
    let outcome = ShortcutStore::load(path)?;
    match &outcome.condition {
        LoadCondition::Fresh => emit(
            Level::Info,
            "store.fresh",
            &format!(
                "{} is empty or doesn't exist. Starting with no shortcuts.",
                path.display()
            ),
            Some(json!({ "path": path })),
        ),
        LoadCondition::Corrupt(reason) => emit(
            Level::Warn,
            "store.corrupt",
            &format!(
                "{} is corrupted ({}). Starting with no shortcuts; the old file is kept as a .bak on save.",
                path.display(),
                reason
            ),
            Some(json!({ "path": path, "reason": reason.to_string() })),
        ),
        LoadCondition::Loaded => emit(
            Level::Debug,
            "store.loaded",
            &format!(
                "Loaded {} shortcuts from {}",
                outcome.store.len(),
                path.display()
            ),
            None,
        ),
    }
    Ok(outcome.store)
}

fn announce_restart() {
    emit(
        Level::Info,
        "steam.restart_needed",
        "Restart Steam to see the new shortcuts in your library.",
        Some(json!({ "restart_needed": true })),
    );
}

fn handle_list(ctx: &RunContext) -> Result<()> {
    let path = ctx.shortcuts_path()?;
    let store = load_store(&path)?;

    if ctx.output == OutputFormat::Json {
        let entries: Vec<_> = store
            .iter()
            .map(|s| {
                json!({
                    "key": s.key,
                    "name": s.display_name,
                    "exe": s.executable_path,
                    "start_dir": s.working_directory,
                    "launch_options": s.launch_arguments,
                    "tags": s.tags,
                })
            })
            .collect();
        emit(
            Level::Info,
            "store.list",
            &format!("{} shortcuts", store.len()),
            Some(json!({ "path": path, "shortcuts": entries })),
        );
        return Ok(());
    }

    if store.is_empty() {
        emit(Level::Info, "store.list", "No shortcuts.", None);
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Key", "Name", "Tags", "Executable"]);
    for s in store.iter() {
        table.add_row(vec![
            s.key.to_string(),
            s.display_name.clone(),
            s.tags.join(", "),
            s.executable_path.clone(),
        ]);
    }
    text(&table.to_string());
    Ok(())
}

fn handle_add(ctx: &RunContext, title: &str, url: &str) -> Result<()> {
    let title = title.trim();
    let url = url.trim();
    if title.is_empty() || url.is_empty() {
        bail!("Please enter both a game title and a URL.");
    }

    ctx.ensure_steam_stopped()?;
    let path = ctx.shortcuts_path()?;
    let mut store = load_store(&path)?;
    let profile = ctx.launch_profile(&store)?;

    let shortcut = profile.shortcut_for(title, url);
    if store.contains_equivalent(&shortcut) {
        emit(
            Level::Info,
            "shortcut.exists",
            &format!("{} is already in Steam shortcuts.", title),
            None,
        );
        return Ok(());
    }
    if let Some(existing) = store.find_by_name(title) {
        emit(
            Level::Warn,
            "shortcut.name_taken",
            &format!(
                "A different shortcut named {} already exists (key {}); adding another.",
                title, existing.key
            ),
            None,
        );
    }

    let key = store.add(shortcut)?;
    store.save(&path)?;
    emit(
        Level::Success,
        "shortcut.added",
        &format!("Added {} to Steam shortcuts.", title),
        Some(json!({ "key": key, "title": title, "url": url })),
    );
    announce_restart();
    Ok(())
}

fn batch_files(ctx: &RunContext, file: Option<PathBuf>, ledger: Option<PathBuf>) -> BatchFiles {
    BatchFiles::new(
        file.unwrap_or_else(|| ctx.settings.batch_file.clone()),
        ledger.unwrap_or_else(|| ctx.settings.ledger_file.clone()),
    )
}

fn print_preview(preview: &PreviewedBatch) {
    if is_json_output() {
        emit(
            Level::Info,
            "batch.preview",
            &format!(
                "{} to add, {} skipped",
                preview.addable().len(),
                preview.skipped().len()
            ),
            serde_json::to_value(preview).ok(),
        );
        return;
    }

    if !preview.addable().is_empty() {
        text(&"Games to be added:".bold().to_string());
        for line in preview.addable() {
            text(&format!("  {}", preview_label(&line.title, &line.url)));
        }
    }
    if !preview.skipped().is_empty() {
        text(&"Skipped:".bold().to_string());
        for skip in preview.skipped() {
            text(&format!("  {} ({})", skip.label, skip.reason).dimmed().to_string());
        }
    }
}

fn is_json_output() -> bool {
    get_output_format() == OutputFormat::Json
}

fn handle_preview(ctx: &RunContext, file: Option<PathBuf>) -> Result<()> {
    let files = batch_files(ctx, file, None);
    let source = files.read_source()?;
    let preview = LoadedBatch::load(&source).classify();
    print_preview(&preview);
    if preview.is_empty() {
        emit(Level::Info, "batch.nothing_to_do", "No valid games to add.", None);
    }
    Ok(())
}

fn handle_batch(
    ctx: &RunContext,
    file: Option<PathBuf>,
    ledger: Option<PathBuf>,
    yes: bool,
) -> Result<()> {
    let files = batch_files(ctx, file, ledger);
    let source = files.read_source()?;
    let preview = LoadedBatch::load(&source).classify();
    print_preview(&preview);

    if preview.is_empty() {
        emit(Level::Info, "batch.nothing_to_do", "No valid games to add.", None);
        return Ok(());
    }

    ctx.ensure_steam_stopped()?;
    let path = ctx.shortcuts_path()?;
    let mut store = load_store(&path)?;
    let profile = ctx.launch_profile(&store)?;

    if !yes {
        if ctx.output == OutputFormat::Json {
            bail!("Refusing to prompt in JSON mode; pass --yes to confirm the batch.");
        }
        let confirmed = Confirm::new()
            .with_prompt("Proceed with adding these games?")
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !confirmed {
            let cancelled = preview.cancel();
            emit(
                Level::Info,
                "batch.cancelled",
                "Batch addition canceled.",
                Some(json!({ "declined": cancelled.declined.len() })),
            );
            return Ok(());
        }
    }

    let applied = preview.apply(&mut store, &profile)?;
    for line in &applied.applied {
        emit(
            Level::Success,
            "shortcut.added",
            &format!("Added {} to Steam shortcuts.", line.line.title),
            Some(json!({ "key": line.key, "title": line.line.title })),
        );
    }
    for line in &applied.already_present {
        emit(
            Level::Info,
            "shortcut.exists",
            &format!("{} is already in Steam shortcuts.", line.title),
            None,
        );
    }

    let report = files.commit(&source, &applied, &store, &path)?;
    emit(
        Level::Success,
        "batch.applied",
        &format!(
            "Added {} shortcuts. Updated {} and {}.",
            applied.applied_count(),
            files.source.display(),
            files.ledger.display()
        ),
        serde_json::to_value(&report).ok(),
    );

    if applied.restart_needed() {
        announce_restart();
    }
    Ok(())
}

fn handle_merge(ctx: &RunContext, other: &Path) -> Result<()> {
    let incoming = ShortcutStore::load(other)?;
    if let LoadCondition::Corrupt(reason) = incoming.condition {
        bail!("Cannot merge {}: {}", other.display(), reason);
    }

    ctx.ensure_steam_stopped()?;
    let path = ctx.shortcuts_path()?;
    let mut store = load_store(&path)?;

    let report = store.merge(&incoming.store)?;
    if report.inserted.is_empty() {
        emit(
            Level::Info,
            "merge.nothing_to_do",
            "Every shortcut is already present.",
            None,
        );
        return Ok(());
    }

    store.save(&path)?;
    emit(
        Level::Success,
        "merge.applied",
        &format!(
            "Merged {} shortcuts ({} already present).",
            report.inserted.len(),
            report.skipped.len()
        ),
        Some(json!({ "inserted": report.inserted, "skipped": report.skipped })),
    );
    announce_restart();
    Ok(())
}

fn handle_browsers(ctx: &RunContext) -> Result<()> {
    let installed = SystemHost.installed_browsers()?;
    let selected = ctx.selected_browser().ok();

    if installed.is_empty() {
        emit(
            Level::Warn,
            "browsers.none",
            "No compatible browser found. Install Chrome or Edge from Flathub.",
            None,
        );
        return Ok(());
    }

    for browser in &installed {
        let marker = if Some(*browser) == selected { "*" } else { " " };
        emit(
            Level::Info,
            "browsers.installed",
            &format!("{} {} ({})", marker, browser.name, browser.app_id),
            Some(json!({ "name": browser.name, "app_id": browser.app_id })),
        );
    }

    if let Some(selected) = selected
        && !installed.contains(&selected)
    {
        emit(
            Level::Warn,
            "browsers.selected_missing",
            &format!("Configured browser {} is not installed.", selected.name),
            None,
        );
    }
    Ok(())
}

fn handle_permissions(fix: bool) -> Result<()> {
    let host = SystemHost;
    let mut fixed = Vec::new();
    let mut missing = Vec::new();

    for browser in host.installed_browsers()? {
        if host.has_filesystem_access(browser.app_id, UDEV_PATH)? {
            continue;
        }
        if fix {
            host.grant_filesystem_access(browser.app_id, UDEV_PATH)?;
            fixed.push(browser.name);
        } else {
            missing.push(browser.name);
        }
    }

    if fixed.is_empty() && missing.is_empty() {
        emit(
            Level::Success,
            "permissions.ok",
            "All installed browsers have correct permissions.",
            None,
        );
    }
    if !fixed.is_empty() {
        emit(
            Level::Success,
            "permissions.fixed",
            &format!("Permissions updated for: {}", fixed.join(", ")),
            None,
        );
    }
    if !missing.is_empty() {
        emit(
            Level::Warn,
            "permissions.missing",
            &format!(
                "Missing {} access for: {}. Run with --fix to grant it.",
                UDEV_PATH,
                missing.join(", ")
            ),
            None,
        );
    }
    Ok(())
}

fn handle_config(ctx: &mut RunContext, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            let rendered =
                toml::to_string_pretty(&ctx.settings).context("serializing settings")?;
            if ctx.output == OutputFormat::Json {
                emit(
                    Level::Info,
                    "config.show",
                    "Current settings",
                    serde_json::to_value(&ctx.settings).ok(),
                );
            } else {
                text(rendered.trim_end());
            }
        }
        ConfigCommands::Path => {
            let path = paths::settings_path()?;
            emit(
                Level::Info,
                "config.path",
                &path.display().to_string(),
                Some(json!({ "path": path })),
            );
        }
        ConfigCommands::SetBrowser { name } => {
            let browser =
                known_browser(&name).ok_or_else(|| anyhow!("Unsupported browser '{}'", name))?;
            ctx.settings.browser = browser.name.to_string();
            ctx.settings.save()?;
            emit(
                Level::Success,
                "config.saved",
                &format!("Using {} for shortcuts.", browser.name),
                None,
            );
        }
        ConfigCommands::SetCollection { name } => {
            let name = name.trim();
            if name.is_empty() {
                bail!("Collection name must not be empty");
            }
            ctx.settings.collection = name.to_string();
            ctx.settings.save()?;
            emit(
                Level::Success,
                "config.saved",
                &format!("New shortcuts go to the {} collection.", name),
                None,
            );
        }
    }
    Ok(())
}
