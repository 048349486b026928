use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};

use crate::client::DisplayZone;
use crate::client::timezone::{to_input_value, to_utc_iso};

pub fn to_utc(value: &str, zone: DisplayZone) -> Result<String> {
    to_utc_iso(value, zone).ok_or_else(|| {
        anyhow!(
            "{} is not a yyyy-MM-ddTHH:mm value in {}",
            value,
            zone.label()
        )
    })
}

pub fn to_local(value: &str, zone: DisplayZone) -> Result<String> {
    let instant = DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc);
    Ok(to_input_value(instant, zone))
}
