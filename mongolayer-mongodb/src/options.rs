//! Translation of find options into the driver's option type.

use mongodb::options::FindOptions as DriverFindOptions;

use mongolayer_core::query::FindOptions;

/// Maps backend-neutral find options onto the driver's.
///
/// Skip and limit are carried over independently. Limits too large for the driver's
/// signed type saturate.
pub(crate) fn to_driver_options(options: FindOptions) -> DriverFindOptions {
    let mut driver = DriverFindOptions::default();

    driver.sort = options.sort;
    driver.skip = options.skip;
    driver.limit = options
        .limit
        .map(|limit| i64::try_from(limit).unwrap_or(i64::MAX));

    driver
}
