use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use snaptask_core::ScheduledItem;
use std::fs;
use std::path::{Path, PathBuf};

pub fn snaptask_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".snaptask"))
}

pub fn ensure_snaptask_home() -> Result<PathBuf> {
    let dir = snaptask_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// Where `--save` puts the most recent schedule.
pub fn latest_schedule_path() -> Result<PathBuf> {
    let dir = ensure_snaptask_home()?.join("schedules");
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir.join("latest.json"))
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let s = serde_json::to_string_pretty(value)?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn save_latest_schedule(items: &[ScheduledItem]) -> Result<PathBuf> {
    let p = latest_schedule_path()?;
    write_json(&p, items)?;
    Ok(p)
}

/// Load a schedule from `path`, or the latest saved one.
pub fn load_schedule(path: Option<&Path>) -> Result<Vec<ScheduledItem>> {
    match path {
        Some(p) => read_json(p),
        None => {
            let p = latest_schedule_path()?;
            if !p.exists() {
                anyhow::bail!(
                    "no saved schedule at {}. Run `snaptask pack --save` or pass --schedule",
                    p.display()
                );
            }
            read_json(&p)
        }
    }
}
