mod devices;
mod error;
mod reading;
mod util;

pub use devices::parse_device_list;
pub use error::{ApiError, ErrorKind};
pub use reading::{CHANNELS, Reading, WIRE_KEYS};
pub use util::{format_float, now_secs, round_to};
