//! Plain-text rendering for command output.

use chrono::{DateTime, Utc};

use ninelives_core::CatStatus;
use ninelives_types::{CatView, MAX_LIVES, RESTORE_PRICE, Stage, TokenAmount};

pub(crate) fn stage_name(stage: u8) -> &'static str {
    Stage::from_u8(stage).map_or("unknown", Stage::as_str)
}

/// `2026-01-02 03:04:05 UTC`, or the raw seconds when out of chrono's range.
pub(crate) fn timestamp(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map_or_else(
            || format!("{secs}s since epoch"),
            |at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        )
}

/// `5h 03m 09s`, dropping leading zero units.
pub(crate) fn countdown(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}

pub(crate) fn cat_line(cat: &CatView) -> String {
    format!(
        "lives {}/{MAX_LIVES}, streak {}, stage {}",
        cat.lives,
        cat.streak,
        stage_name(cat.stage)
    )
}

/// `adult at streak 7 (4 to go)`, or `fully grown` at the top tier.
pub(crate) fn next_stage(cat: &CatView) -> String {
    let Some(stage) = Stage::from_u8(cat.stage) else {
        return "unknown".to_string();
    };
    match (
        stage.next_threshold(),
        Stage::from_u8(cat.stage.saturating_add(1)),
    ) {
        (Some(at), Some(next)) => {
            format!("{next} at streak {at} ({} to go)", at.saturating_sub(cat.streak))
        }
        _ => "fully grown".to_string(),
    }
}

pub(crate) fn status(status: &CatStatus) -> String {
    let cat = &status.cat;
    let next = if status.can_check_in {
        "available now".to_string()
    } else {
        format!("in {}", countdown(status.secs_until_check_in))
    };
    let mut out = String::new();
    out.push_str(&format!("lives:         {}/{MAX_LIVES}\n", cat.lives));
    out.push_str(&format!("streak:        {}\n", cat.streak));
    out.push_str(&format!("stage:         {}\n", stage_name(cat.stage)));
    out.push_str(&format!("next stage:    {}\n", next_stage(cat)));
    out.push_str(&format!(
        "last check-in: {}\n",
        timestamp(cat.last_check_in)
    ));
    out.push_str(&format!("next check-in: {next}"));
    out
}

pub(crate) fn wallet(balance: TokenAmount, allowance: TokenAmount) -> String {
    format!(
        "balance:       {balance}\nallowance:     {allowance}\nrestore price: {RESTORE_PRICE}"
    )
}
