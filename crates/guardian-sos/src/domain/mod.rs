//! Domain module containing the SOS entities and value objects.
//!
//! - **Entities**: `AlertSession` (owned by the dispatcher), `Contact`
//! - **Value Objects**: `MotionSample`, `AnomalyEvent`, `LocationFix`, `AlertPayload`, `DispatchOutcome`
//! - **Records**: what gets persisted for responders and for the user's history

pub mod contact;
pub mod location;
pub mod motion;
pub mod outcome;
pub mod payload;
pub mod records;
pub mod session;

pub use contact::*;
pub use location::*;
pub use motion::*;
pub use outcome::*;
pub use payload::*;
pub use records::*;
pub use session::*;
