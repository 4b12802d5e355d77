mod lstar;
pub use lstar::*;

pub(crate) mod oracle;
pub use oracle::*;

mod hypothesis;
pub use hypothesis::*;

mod outcome;
pub use outcome::*;

mod counterexample;
pub use counterexample::CounterexampleStrategy;

mod observationtable;
pub use observationtable::*;
