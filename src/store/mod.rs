pub mod disk;
pub mod memory;

use crate::core::stock::StockRecord;
pub use disk::DiskStockStore;
pub use memory::MemoryStockStore;
use uuid::Uuid;

/// Ids are the store's business: a record keeps its id across upserts and gets a
/// fresh one on first save.
pub(crate) fn with_id(mut record: StockRecord) -> StockRecord {
    if record.id.is_none() {
        record.id = Some(Uuid::new_v4().to_string());
    }
    record
}
