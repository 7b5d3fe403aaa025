pub mod convert;
pub mod fetch;
pub mod locate;

pub use convert::{convert_invocation, ConvertStep};
pub use fetch::{fetch_invocation, FetchStep};
pub use locate::{locate_artifact, LocateStep};
