use crate::commands::{CmdMessage, CmdResult};
use crate::error::{LeafwindError, Result};
use crate::tid::Tid;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

pub const MAX_COUNT: usize = 10_000;

/// Generate `count` distinct TIDs, returned in ascending order.
pub fn generate(count: usize) -> Result<CmdResult> {
    if count == 0 || count > MAX_COUNT {
        return Err(LeafwindError::InvalidInput(format!(
            "count must be between 1 and {}",
            MAX_COUNT
        )));
    }

    let mut tids = BTreeSet::new();
    while tids.len() < count {
        tids.insert(Tid::now());
    }
    Ok(CmdResult::default().with_tids(tids.iter().map(Tid::to_string).collect()))
}

/// Decode a TID and describe its timestamp and clock id.
pub fn inspect(value: &str) -> Result<CmdResult> {
    let tid: Tid = value.parse()?;
    let micros = tid.timestamp_micros();
    let when = i64::try_from(micros)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_micros)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "out of range".to_string());

    let mut result = CmdResult::default().with_tids(vec![tid.to_string()]);
    result.add_message(CmdMessage::info(format!(
        "{}  timestamp {} ({} µs)  clock id {}",
        tid,
        when,
        micros,
        tid.clock_id()
    )));
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_sorted_and_unique() {
        let res = generate(50).unwrap();
        assert_eq!(res.tids.len(), 50);
        let mut sorted = res.tids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted, res.tids);
        assert!(res.tids.iter().all(|t| t.len() == 13));
    }

    #[test]
    fn test_generate_bounds() {
        assert!(generate(0).is_err());
        assert!(generate(MAX_COUNT + 1).is_err());
    }

    #[test]
    fn test_inspect_known_value() {
        let tid = Tid::from_parts(1_700_000_000_000_000, 7);
        let res = inspect(&tid.to_string()).unwrap();
        let msg = &res.messages[0].content;
        assert!(msg.contains("2023-11-14T22:13:20"), "{}", msg);
        assert!(msg.contains("clock id 7"), "{}", msg);
    }

    #[test]
    fn test_inspect_rejects_garbage() {
        assert!(matches!(
            inspect("not-a-tid"),
            Err(LeafwindError::InvalidTid(_))
        ));
    }
}
