pub mod assembly;
pub mod calib_id;
pub mod constants;
pub mod diagnostics;
pub mod fallback;
pub mod formatter;
pub mod header;
pub mod id_codec;
pub mod instrument;
pub mod obsinfo_errors;
pub mod time;
pub mod translate;

pub use instrument::{Instrument, InstrumentProfile};
pub use obsinfo_errors::ObsInfoError;
pub use translate::{translate, CanonicalObservation, Translation};
