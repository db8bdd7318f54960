//! The file transfer job engine.

mod archive;
mod collision;
mod decision;
mod resolve;
mod state;
mod transfer;

pub use archive::{RwArchive, optimize_archive};
pub use collision::{CollisionKind, case_only_variation, classify};
pub use decision::{
    CollisionAction, CollisionPrompt, CollisionVerdict, DecisionProvider, FileFacts, PolicyDecider,
    RetryChoice,
};
pub use resolve::{ResolutionOutcome, create_destination, resolve_collision};
pub use state::{JobMonitor, ResolutionContext};
pub use transfer::{TransferJob, TransferMode, TransferStats};
