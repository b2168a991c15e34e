//! This module is responsible for reading the import inputs (street tables,
//! GTFS stops, the elevator feed) into the in-memory model.

mod config;
mod fasta;
pub mod gtfs;
pub mod streets;
mod table;

pub use config::{Feature, ImportConfig};
pub use fasta::{parse_fasta, read_fasta};
pub use gtfs::locations_from_gtfs;
pub use streets::street_graph_from_csv;

/// Release free heap memory back to the system after large imports
pub(crate) fn trim_memory() {
    // While parsing CSV tables and building search structures large amounts
    // of memory are allocated and not always returned to the system.
    //
    // # Safety
    //
    // This call is safe to use on linux with glibc implementation
    // which is checked by the cfg attribute in compile time.
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    unsafe {
        if libc::malloc_trim(0) == 0 {
            log::warn!("Memory trimming failed - continuing anyway");
        } else {
            log::debug!("Successfully trimmed unused heap memory");
        }
    }
}
