pub mod alert_api;
pub mod geo_utils;
pub mod normalize;
pub mod query;
pub mod report;
pub mod sweep;

pub use alert_api::{AlertProvider, FetchError, InfoDengueProvider};
pub use geo_utils::{IbgeDirectory, Municipality, StateBR, StateNotFoundError, get_state_info};
pub use normalize::{AlertRow, Normalized, NormalizeError, normalize};
pub use query::{Disease, QueryWindow, WindowError};
pub use report::{SweepSummary, finalize, write_csv};
pub use sweep::{
    FixedDelayLimiter, MunicipalityOutcome, Outcome, RateLimiter, SweepConfig, SweepDriver,
    SweepOutput,
};
