//! Feature data port.

use crate::domain::error::MomtraderError;
use crate::domain::priced_day::PricedDay;
use chrono::NaiveDate;

/// Source of per-ticker feature rows.
pub trait FeatureProvider {
    /// Rows dated within `[start, end]`, ascending, without NaN.
    ///
    /// A ticker with no source yields an empty vector, not an error.
    fn load(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricedDay>, MomtraderError>;

    /// First date, last date and row count of everything the source holds.
    fn data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, MomtraderError>;
}
