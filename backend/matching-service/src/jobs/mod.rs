pub mod profile_sync;
pub mod zone_index_sync;

pub use profile_sync::{ProfileSyncJob, SyncReport};
pub use zone_index_sync::{ZoneIndexSyncJob, ZoneSyncError, ZoneSyncReport};
