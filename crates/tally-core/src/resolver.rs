//! The system-of-record boundary — garment attribute lookups at scan time.

use std::future::Future;

use crate::tag::GarmentAttributes;

/// Resolves garment master data (WO/style/buyer/item/color/size) for a tag.
///
/// Called only on the ingest path, once per scan. It is never used to
/// reconstruct aggregate state — the snapshot rebuilds from the Scan Store
/// alone. A failed lookup degrades the scan's attributes rather than failing
/// ingestion.
pub trait AttributeResolver: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn resolve<'a>(
    &'a self,
    tag_id: &'a str,
  ) -> impl Future<Output = Result<GarmentAttributes, Self::Error>> + Send + 'a;
}
