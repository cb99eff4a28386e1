//! Player record files.
//!
//! `<root>/PlayerData/<playerID>` holds four lines: last login, accrued
//! blocks, bonus blocks and a blank line. Files are always rewritten whole.

use std::fs;
use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use landclaim_types::{PlayerId, PlayerRecord, LAST_LOGIN_FORMAT};
use tracing::{debug, error, warn};

/// Render a record in its on-disk form. An unset last login becomes `now`.
pub(crate) fn render(record: &PlayerRecord, now: NaiveDateTime) -> String {
    let last_login = record.last_login.unwrap_or(now);
    format!(
        "{}\n{}\n{}\n\n",
        last_login.format(LAST_LOGIN_FORMAT),
        record.accrued_blocks,
        record.bonus_blocks
    )
}

/// Overwrite the player's file with `record`.
pub(crate) fn write(path: &Path, record: &PlayerRecord) -> io::Result<()> {
    fs::write(path, render(record, Local::now().naive_local()))
}

/// Read a player file, tolerating a concurrent writer.
///
/// A missing file yields the zero-valued record. Otherwise the file is read
/// up to `retries + 1` times with `pause` between attempts until all three
/// fields parse. Fields parsed by an earlier attempt are kept, so if every
/// attempt fails the record is returned in whatever partial state was
/// reached.
pub(crate) fn read(path: &Path, player: PlayerId, retries: u32, pause: Duration) -> PlayerRecord {
    if !path.exists() {
        return PlayerRecord::new(player);
    }
    read_with_retry(player, retries, pause, || fs::read_to_string(path))
}

pub(crate) fn read_with_retry<F>(
    player: PlayerId,
    retries: u32,
    pause: Duration,
    mut read: F,
) -> PlayerRecord
where
    F: FnMut() -> io::Result<String>,
{
    let mut record = PlayerRecord::new(player);
    let mut last_error = None;

    for attempt in 0..=retries {
        match read().map_err(|e| e.to_string()).and_then(|text| parse_into(&mut record, &text)) {
            Ok(()) => {
                if attempt > 0 {
                    debug!(player = %player, attempt, "player file read after retry");
                }
                return record;
            }
            Err(e) => {
                debug!(player = %player, attempt, error = %e, "incomplete player file");
                last_error = Some(e);
            }
        }
        if attempt < retries {
            thread::sleep(pause);
        }
    }

    if let Some(e) = last_error {
        error!(
            player = %player,
            attempts = retries + 1,
            error = %e,
            "giving up reading player file"
        );
    }
    record
}

/// Fill `record` from file text. Stops at the first missing or bad count.
fn parse_into(record: &mut PlayerRecord, text: &str) -> Result<(), String> {
    let mut lines = text.lines();

    let login = lines.next().ok_or("missing last login line")?;
    record.last_login = match NaiveDateTime::parse_from_str(login.trim(), LAST_LOGIN_FORMAT) {
        Ok(ts) => Some(ts),
        Err(e) => {
            warn!(player = %record.player, value = login, error = %e, "unable to load last login");
            None
        }
    };

    record.accrued_blocks = parse_count(lines.next(), "accrued blocks")?;
    record.bonus_blocks = parse_count(lines.next(), "bonus blocks")?;
    Ok(())
}

fn parse_count(line: Option<&str>, field: &str) -> Result<i32, String> {
    let line = line.ok_or_else(|| format!("missing {field} line"))?;
    line.trim().parse().map_err(|e| format!("bad {field} {line:?}: {e}"))
}
