//! Adaptive frame selection: decides, frame by frame, which frames of a video
//! carry meaningful visual change and which are redundant.
//!
//! Pipeline: frame source → [`preprocess::canonicalize`] → [`Similarity`]
//! oracle → [`SelectionEngine`] → [`DecisionSink`].

pub mod clock;
pub mod preprocess;
pub mod report;
pub mod selector;
pub mod session;
pub mod similarity;

pub use clock::{Clock, StreamClock, WallClock};
pub use preprocess::canonicalize;
pub use report::{Aggregator, DecisionEvent, DecisionSink, Summary, TracingSink};
pub use selector::{Counters, Decision, EngineError, EngineState, Outcome, SelectionEngine};
pub use session::{process_video, CancelToken, Session, SessionEnd, SessionError, SessionReport};
pub use similarity::{Similarity, WindowedSsim};
