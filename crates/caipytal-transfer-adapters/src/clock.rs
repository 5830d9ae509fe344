use chrono::{DateTime, Utc};

use caipytal_transfer_core::{ClockPort, PortError};

#[derive(Debug, Clone, Default)]
pub struct SystemClockAdapter;

impl ClockPort for SystemClockAdapter {
    fn now(&self) -> Result<DateTime<Utc>, PortError> {
        Ok(Utc::now())
    }
}
