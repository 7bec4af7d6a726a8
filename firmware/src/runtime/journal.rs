use defmt::{Display2Format, error, info, warn};
use lockbox_core::journal::{Journal, Severity};

/// Mirrors journal records newer than `last_seen` to RTT and returns the
/// newest id emitted.
pub fn drain(journal: &Journal, last_seen: u32) -> u32 {
    let mut newest = last_seen;
    for record in journal.since(last_seen) {
        match record.kind.severity() {
            Severity::Info => info!("{}", Display2Format(record)),
            Severity::Warn => warn!("{}", Display2Format(record)),
            Severity::Error => error!("{}", Display2Format(record)),
        }
        newest = record.id;
    }
    newest
}
