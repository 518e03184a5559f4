use thiserror::Error;

use crate::driver::DriverError;
use crate::existing_driver::SessionError;
use crate::screenshot::ScreenshotError;

/// Any failure a test script can hit.
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error(transparent)]
    Screenshot(#[from] ScreenshotError),
}
