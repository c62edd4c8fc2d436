pub mod phase;
pub mod scores;
pub mod votes;

pub use phase::{Phase, PhaseStatus};

// Per-nominee vote (or fallback nomination) tally for a closed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteCount {
    pub collaborator_id: String,
    pub count: u64,
    pub rank: usize,
}

// Real-time standing for an active event. `score` is the 0-100 rescaled
// peer-evaluation average; None until the nominee has at least one
// evaluation. The caller decides how to display missing data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    pub collaborator_id: String,
    pub score: Option<u8>,
    pub position: usize,
}
