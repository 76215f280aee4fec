//! Grid source abstraction.
//!
//! Login, navigation, and page parsing of the booking systems live outside
//! this crate. An adapter only has to hand back a [`RawGrid`] for one clinic
//! and one day.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::config::ClinicConfig;
use crate::error::SourceError;
use crate::models::{RawGrid, SourceSystem};

/// Adapter for one booking system.
///
/// Implementations must be thread-safe (Send + Sync); one instance serves all
/// clinics of its system concurrently.
#[async_trait]
pub trait GridSource: Send + Sync {
    /// Booking system served by this adapter.
    fn system(&self) -> SourceSystem;

    /// Fetch the booking grid of a clinic for a day.
    ///
    /// # Arguments
    /// * `clinic` - Configured clinic (name, url)
    /// * `date` - Day to fetch
    ///
    /// # Returns
    /// * `Ok(RawGrid)` - Rows and per-staff cells as shown by the system
    /// * `Err(SourceError)` - Login, navigation, or parsing failed
    async fn fetch_grid(&self, clinic: &ClinicConfig, date: NaiveDate) -> Result<RawGrid, SourceError>;
}
