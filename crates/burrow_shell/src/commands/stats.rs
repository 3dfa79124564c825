//! The `stats` command.
//!
//! The surfaced counters are listed explicitly below, so adding a counter
//! to the engine does not change the command's output until it is added
//! here too.

use crate::error::{ShellError, ShellResult};
use crate::reply::{Field, Reply};
use burrow_core::{Database, StatsSnapshot, TxStats};
use bytes::Bytes;
use std::collections::BTreeMap;

/// Key the transaction counters are nested under.
pub const TX_STATS_KEY: &str = "TxStats";

/// Store-level counters, by display name.
pub fn store_fields(stats: &StatsSnapshot) -> [(&'static str, u64); 7] {
    [
        ("TxN", stats.tx_n),
        ("OpenTxN", stats.open_tx_n),
        ("WriteTxN", stats.write_tx_n),
        ("RollbackN", stats.rollback_n),
        ("LogSize", stats.log_size),
        ("BucketN", stats.bucket_n),
        ("KeyN", stats.key_n),
    ]
}

/// Write transaction counters, by display name. `WriteTime` is in
/// nanoseconds.
pub fn tx_fields(stats: &TxStats) -> [(&'static str, u64); 7] {
    [
        ("PutN", stats.put_n),
        ("DeleteN", stats.delete_n),
        ("BucketCreateN", stats.bucket_create_n),
        ("BucketDeleteN", stats.bucket_delete_n),
        ("NodeCopyN", stats.node_copy_n),
        ("Write", stats.write),
        (
            "WriteTime",
            u64::try_from(stats.write_time.as_nanos()).unwrap_or(u64::MAX),
        ),
    ]
}

/// Builds the nested map `stats` replies with.
pub fn project(stats: &StatsSnapshot) -> BTreeMap<String, Field> {
    let mut fields: BTreeMap<String, Field> = store_fields(stats)
        .into_iter()
        .map(|(name, value)| (name.to_string(), Field::from(value)))
        .collect();

    let tx = tx_fields(&stats.tx_stats)
        .into_iter()
        .map(|(name, value)| (name.to_string(), Field::from(value)))
        .collect();
    fields.insert(TX_STATS_KEY.to_string(), Field::Map(tx));
    fields
}

/// `stats`
pub(super) fn stats(db: &Database, args: &[Bytes]) -> ShellResult<Reply> {
    if !args.is_empty() {
        return Err(ShellError::ArgumentCount("stats"));
    }
    Ok(Reply::Map(project(&db.stats()?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn projection_nests_tx_stats() {
        let snapshot = StatsSnapshot {
            tx_n: 4,
            key_n: 2,
            tx_stats: TxStats {
                put_n: 3,
                write_time: Duration::from_micros(2),
                ..TxStats::default()
            },
            ..StatsSnapshot::default()
        };

        let fields = project(&snapshot);
        assert_eq!(fields.len(), 8);
        assert_eq!(fields["TxN"], Field::Integer(4));
        assert_eq!(fields["KeyN"], Field::Integer(2));

        let Field::Map(tx) = &fields[TX_STATS_KEY] else {
            panic!("TxStats is not a map");
        };
        assert_eq!(tx.len(), 7);
        assert_eq!(tx["PutN"], Field::Integer(3));
        assert_eq!(tx["WriteTime"], Field::Integer(2_000));
    }
}
