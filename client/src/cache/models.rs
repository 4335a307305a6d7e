use serde::{Deserialize, Serialize};

use shared::ScanRecord;

/// On-disk shape of the local history cache, newest record first.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CachedHistory {
    pub records: Vec<ScanRecord>,
}
