use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use moka::sync::Cache;
use tracing::{debug, info, warn};

use crate::clock::{ClockOffset, IST};

/// Both instants live under one key so readers never see half of a sync.
const OFFSET_KEY: &str = "clockOffset";

/// Session-scoped home of the clock offset.
///
/// The offset lives in memory until the TTL runs out. When a file is
/// configured it is mirrored there under the fixed names `serverTimeFetched`
/// and `clientTimeFetched`, so a restart on the same IST day reuses it.
pub struct OffsetStore {
    cache: Cache<&'static str, ClockOffset>,
    file: Option<PathBuf>,
}

impl OffsetStore {
    pub fn new(ttl: Duration, file: Option<PathBuf>) -> Self {
        let cache = Cache::builder()
            .time_to_live(ttl)
            .build();
        Self { cache, file }
    }

    pub fn load(&self) -> Option<ClockOffset> {
        self.cache.get(&OFFSET_KEY)
    }

    pub fn save(&self, offset: &ClockOffset) {
        self.cache.insert(OFFSET_KEY, *offset);

        if let Some(path) = &self.file {
            let written = serde_json::to_vec(offset)
                .map_err(|e| e.to_string())
                .and_then(|bytes| fs::write(path, bytes).map_err(|e| e.to_string()));
            if let Err(e) = written {
                warn!(path = %path.display(), error = %e, "Failed to persist clock offset");
            }
        }
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
        if let Some(path) = &self.file {
            if let Err(e) = fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "Failed to remove clock offset file");
                }
            }
        }
    }

    /// Pull a mirrored offset back into memory if it was captured on `today` (IST).
    pub fn restore(&self, today: NaiveDate) -> Option<ClockOffset> {
        let path = self.file.as_ref()?;
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "No stored clock offset");
                return None;
            }
        };
        let offset: ClockOffset = match serde_json::from_slice(&bytes) {
            Ok(o) => o,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable clock offset file");
                return None;
            }
        };

        let captured_on = offset
            .fetched_at()
            .map(|t| t.with_timezone(&*IST).date_naive());
        if captured_on != Some(today) {
            info!(?captured_on, %today, "Stored clock offset is from another day, discarding");
            return None;
        }

        self.cache.insert(OFFSET_KEY, offset);
        info!(offset_ms = offset.offset_ms(), "Restored clock offset from file");
        Some(offset)
    }
}
