use thiserror::Error;
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime, UtcOffset};

/// Fuso orario di visualizzazione di default (UTC+7, Asia/Jakarta, senza ora legale).
pub const DEFAULT_OFFSET_HOURS: i8 = 7;

/// Formato canonico a larghezza fissa: con un offset fisso l'ordine lessicografico
/// coincide con quello cronologico, lo store ordina su questa stringa.
const CANONICAL: &[FormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9][offset_hour sign:mandatory]:[offset_minute]"
);

/// Costruisce l'offset di visualizzazione a partire dalle ore.
pub fn display_offset(hours: i8) -> Result<UtcOffset, time::error::ComponentRange> {
    UtcOffset::from_hms(hours, 0, 0)
}

#[derive(Debug, Error)]
pub enum TimestampError {
    /// L'istante spostato sull'offset cade fuori dal range rappresentabile (anni -9999..=9999).
    #[error("timestamp out of range for offset {0}")]
    OutOfRange(UtcOffset),
    #[error(transparent)]
    Format(#[from] time::error::Format),
}

/// Converte un istante nella rappresentazione canonica (es. "2025-11-02T19:34:56.000000000+07:00").
pub fn canonical_timestamp(at: OffsetDateTime, offset: UtcOffset) -> Result<String, TimestampError> {
    let shifted = at
        .checked_to_offset(offset)
        .ok_or(TimestampError::OutOfRange(offset))?;
    Ok(shifted.format(CANONICAL)?)
}
